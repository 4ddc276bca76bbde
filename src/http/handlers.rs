use axum::extract::multipart::Multipart;
use axum::extract::{Path, Query, State};
use axum::http::{header, Uri};
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Form, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::auth::AuthService;
use crate::app::comments::CommentService;
use crate::app::groups::GroupService;
use crate::app::paginator::{Page, Paginator};
use crate::app::posts::PostService;
use crate::app::social::FollowService;
use crate::app::users::UserService;
use crate::domain::comment::Comment;
use crate::domain::group::Group;
use crate::domain::post::Post;
use crate::domain::user::Author;
use crate::http::auth::SESSION_COOKIE;
use crate::http::forms::{
    CommentForm, FormErrors, FormField, FormView, PostForm, INVALID_GROUP_MESSAGE,
};
use crate::http::{AppError, AuthUser};
use crate::AppState;

const REQUIRED_FIELD_MESSAGE: &str = "Обязательное поле.";
const BAD_CREDENTIALS_MESSAGE: &str = "Неверное имя пользователя или пароль.";
const USERNAME_TAKEN_MESSAGE: &str = "Пользователь с таким именем уже существует.";

#[derive(Deserialize)]
pub struct PageQuery {
    /// Raw so garbage page numbers reach the paginator instead of failing
    /// extraction.
    pub page: Option<String>,
}

#[derive(Serialize)]
pub struct PageView<T> {
    pub object_list: Vec<T>,
    pub number: i64,
    pub num_pages: i64,
    pub has_next: bool,
    pub has_previous: bool,
}

fn page_view<T>(object_list: Vec<T>, page: &Page) -> PageView<T> {
    PageView {
        object_list,
        number: page.number,
        num_pages: page.num_pages,
        has_next: page.has_next,
        has_previous: page.has_previous,
    }
}

#[derive(Serialize)]
pub struct IndexPage {
    pub page: PageView<Post>,
}

#[derive(Serialize)]
pub struct GroupPage {
    pub group: Group,
    pub page: PageView<Post>,
}

#[derive(Serialize)]
pub struct ProfilePage {
    pub author: Author,
    pub following: bool,
    pub page: PageView<Post>,
}

#[derive(Serialize)]
pub struct PostDetailPage {
    pub post: Post,
    pub comments: Vec<Comment>,
    pub form: FormView,
}

#[derive(Serialize)]
pub struct FormPage {
    pub form: FormView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_edit: Option<bool>,
}

#[derive(Serialize)]
pub struct StaticPage {
    pub title: &'static str,
    pub text: &'static str,
}

// ---------------------------------------------------------------------------
// List pages
// ---------------------------------------------------------------------------

/// All posts, newest first. The serialized page is cached briefly under the
/// full request path and query; writes do not invalidate it.
pub async fn index(
    State(state): State<AppState>,
    uri: Uri,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    let cache_key = format!("page:{}", uri);
    if let Some(body) = state.cache.get_page(&cache_key).await {
        return Ok(json_body(body));
    }

    let service = PostService::new(state.db.clone());
    let total = service.count_all().await.map_err(|err| {
        tracing::error!(error = ?err, "failed to count posts");
        AppError::internal("failed to load posts")
    })?;
    let page = Paginator::new(total, state.page_size).get_page(query.page.as_deref());
    let posts = service.list_page(page.offset, page.limit).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to list posts");
        AppError::internal("failed to load posts")
    })?;

    let body = serde_json::to_string(&IndexPage {
        page: page_view(posts, &page),
    })
    .map_err(|err| {
        tracing::error!(error = ?err, "failed to serialize index page");
        AppError::internal("failed to load posts")
    })?;

    state
        .cache
        .store_page(&cache_key, &body, state.page_cache_ttl_seconds)
        .await;

    Ok(json_body(body))
}

pub async fn group_posts(
    Path(slug): Path<String>,
    State(state): State<AppState>,
    uri: Uri,
    Query(query): Query<PageQuery>,
) -> Result<Json<GroupPage>, AppError> {
    let group = GroupService::new(state.db.clone())
        .get_by_slug(&slug)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, slug, "failed to fetch group");
            AppError::internal("failed to load group")
        })?
        .ok_or_else(|| AppError::not_found(uri.path()))?;

    let service = PostService::new(state.db.clone());
    let total = service.count_by_group(group.id).await.map_err(|err| {
        tracing::error!(error = ?err, slug, "failed to count group posts");
        AppError::internal("failed to load group")
    })?;
    let page = Paginator::new(total, state.page_size).get_page(query.page.as_deref());
    let posts = service
        .list_by_group(group.id, page.offset, page.limit)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, slug, "failed to list group posts");
            AppError::internal("failed to load group")
        })?;

    Ok(Json(GroupPage {
        group,
        page: page_view(posts, &page),
    }))
}

pub async fn profile(
    Path(username): Path<String>,
    auth: Option<AuthUser>,
    State(state): State<AppState>,
    uri: Uri,
    Query(query): Query<PageQuery>,
) -> Result<Json<ProfilePage>, AppError> {
    let author = UserService::new(state.db.clone())
        .get_by_username(&username)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, username, "failed to fetch author");
            AppError::internal("failed to load profile")
        })?
        .ok_or_else(|| AppError::not_found(uri.path()))?;

    // Anonymous viewers never follow anyone.
    let following = match &auth {
        Some(viewer) => FollowService::new(state.db.clone())
            .is_following(viewer.user_id, author.id)
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, username, "failed to check follow state");
                AppError::internal("failed to load profile")
            })?,
        None => false,
    };

    let service = PostService::new(state.db.clone());
    let total = service.count_by_author(author.id).await.map_err(|err| {
        tracing::error!(error = ?err, username, "failed to count author posts");
        AppError::internal("failed to load profile")
    })?;
    let page = Paginator::new(total, state.page_size).get_page(query.page.as_deref());
    let posts = service
        .list_by_author(author.id, page.offset, page.limit)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, username, "failed to list author posts");
            AppError::internal("failed to load profile")
        })?;

    Ok(Json(ProfilePage {
        author: Author::from(&author),
        following,
        page: page_view(posts, &page),
    }))
}

// ---------------------------------------------------------------------------
// Post detail and mutation
// ---------------------------------------------------------------------------

pub async fn post_detail(
    Path(id): Path<String>,
    State(state): State<AppState>,
    uri: Uri,
) -> Result<Json<PostDetailPage>, AppError> {
    let post_id = parse_post_id(&id, uri.path())?;
    let post = PostService::new(state.db.clone())
        .get(post_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = %post_id, "failed to fetch post");
            AppError::internal("failed to load post")
        })?
        .ok_or_else(|| AppError::not_found(uri.path()))?;

    let comments = CommentService::new(state.db.clone())
        .list_for_post(post.id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = %post_id, "failed to list comments");
            AppError::internal("failed to load post")
        })?;

    Ok(Json(PostDetailPage {
        post,
        comments,
        form: CommentForm::default().view(FormErrors::default()),
    }))
}

pub async fn post_create_form(_auth: AuthUser) -> Json<FormPage> {
    Json(FormPage {
        form: PostForm::default().view(FormErrors::default()),
        is_edit: None,
    })
}

pub async fn post_create(
    auth: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let form = PostForm::from_multipart(&mut multipart).await?;

    let mut errors = FormErrors::default();
    let group_id = resolve_group(&state, &form, &mut errors).await?;
    if !errors.is_empty() {
        // Invalid submission re-renders the form, still a 200.
        return Ok(Json(FormPage {
            form: form.view(errors),
            is_edit: None,
        })
        .into_response());
    }

    let image_key = store_image(&state, &form).await?;
    PostService::new(state.db.clone())
        .create(auth.user_id, &form.text, group_id, image_key.as_deref())
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user_id, "failed to create post");
            AppError::internal("failed to create post")
        })?;

    Ok(Redirect::to(&format!("/profile/{}/", auth.username)).into_response())
}

pub async fn post_edit_form(
    Path(id): Path<String>,
    auth: AuthUser,
    State(state): State<AppState>,
    uri: Uri,
) -> Result<Response, AppError> {
    let post_id = parse_post_id(&id, uri.path())?;
    let post = PostService::new(state.db.clone())
        .get(post_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = %post_id, "failed to fetch post");
            AppError::internal("failed to load post")
        })?
        .ok_or_else(|| AppError::not_found(uri.path()))?;

    if post.author_id != Some(auth.user_id) {
        return Ok(redirect_to_post(post_id));
    }

    let form = PostForm {
        text: post.text.clone(),
        group: post.group_id.map(|id| id.to_string()).unwrap_or_default(),
        image: None,
    };
    Ok(Json(FormPage {
        form: form.view(FormErrors::default()),
        is_edit: Some(true),
    })
    .into_response())
}

pub async fn post_edit(
    Path(id): Path<String>,
    auth: AuthUser,
    State(state): State<AppState>,
    uri: Uri,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let post_id = parse_post_id(&id, uri.path())?;
    let service = PostService::new(state.db.clone());
    let post = service
        .get(post_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = %post_id, "failed to fetch post");
            AppError::internal("failed to load post")
        })?
        .ok_or_else(|| AppError::not_found(uri.path()))?;

    // Non-authors are turned away silently; the post is never touched.
    if post.author_id != Some(auth.user_id) {
        return Ok(redirect_to_post(post_id));
    }

    let form = PostForm::from_multipart(&mut multipart).await?;
    let mut errors = FormErrors::default();
    let group_id = resolve_group(&state, &form, &mut errors).await?;
    if !errors.is_empty() {
        return Ok(Json(FormPage {
            form: form.view(errors),
            is_edit: Some(true),
        })
        .into_response());
    }

    let image_key = store_image(&state, &form).await?;
    service
        .update(post_id, &form.text, group_id, image_key.as_deref())
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = %post_id, "failed to update post");
            AppError::internal("failed to update post")
        })?;

    Ok(redirect_to_post(post_id))
}

#[derive(Deserialize)]
pub struct CommentPayload {
    pub text: Option<String>,
}

pub async fn add_comment(
    Path(id): Path<String>,
    auth: AuthUser,
    State(state): State<AppState>,
    uri: Uri,
    Form(payload): Form<CommentPayload>,
) -> Result<Response, AppError> {
    let post_id = parse_post_id(&id, uri.path())?;
    let post = PostService::new(state.db.clone())
        .get(post_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = %post_id, "failed to fetch post");
            AppError::internal("failed to add comment")
        })?
        .ok_or_else(|| AppError::not_found(uri.path()))?;

    let form = CommentForm {
        text: payload.text.unwrap_or_default(),
    };
    let mut errors = FormErrors::default();
    form.validate(&mut errors);

    // Invalid comments are dropped without surfacing anything; the redirect
    // is the same either way.
    if errors.is_empty() {
        CommentService::new(state.db.clone())
            .add(post.id, auth.user_id, &form.text)
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, post_id = %post_id, "failed to add comment");
                AppError::internal("failed to add comment")
            })?;
    }

    Ok(redirect_to_post(post_id))
}

// ---------------------------------------------------------------------------
// Follows
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct FeedPage {
    pub page: PageView<Post>,
}

pub async fn follow_index(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<FeedPage>, AppError> {
    let service = PostService::new(state.db.clone());
    let total = service.count_feed(auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = %auth.user_id, "failed to count feed");
        AppError::internal("failed to load feed")
    })?;
    let page = Paginator::new(total, state.page_size).get_page(query.page.as_deref());
    let posts = service
        .list_feed(auth.user_id, page.offset, page.limit)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user_id, "failed to list feed");
            AppError::internal("failed to load feed")
        })?;

    Ok(Json(FeedPage {
        page: page_view(posts, &page),
    }))
}

pub async fn profile_follow(
    Path(username): Path<String>,
    auth: AuthUser,
    State(state): State<AppState>,
    uri: Uri,
) -> Result<Redirect, AppError> {
    let author = UserService::new(state.db.clone())
        .get_by_username(&username)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, username, "failed to fetch author");
            AppError::internal("failed to follow")
        })?
        .ok_or_else(|| AppError::not_found(uri.path()))?;

    // Self-follows and duplicates fall through the atomic insert; the
    // redirect does not depend on the outcome.
    if author.id != auth.user_id {
        FollowService::new(state.db.clone())
            .follow(auth.user_id, author.id)
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, username, "failed to follow");
                AppError::internal("failed to follow")
            })?;
    }

    Ok(Redirect::to(&format!("/profile/{}/", username)))
}

pub async fn profile_unfollow(
    Path(username): Path<String>,
    auth: AuthUser,
    State(state): State<AppState>,
    uri: Uri,
) -> Result<Redirect, AppError> {
    let author = UserService::new(state.db.clone())
        .get_by_username(&username)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, username, "failed to fetch author");
            AppError::internal("failed to unfollow")
        })?
        .ok_or_else(|| AppError::not_found(uri.path()))?;

    FollowService::new(state.db.clone())
        .unfollow(auth.user_id, author.id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, username, "failed to unfollow");
            AppError::internal("failed to unfollow")
        })?;

    Ok(Redirect::to(&format!("/profile/{}/", username)))
}

// ---------------------------------------------------------------------------
// Static pages and fallbacks
// ---------------------------------------------------------------------------

pub async fn about_author() -> Json<StaticPage> {
    Json(StaticPage {
        title: "Об авторе проекта",
        text: "Автор этого проекта — энтузиаст, который пишет о том, что читает, \
               и читает о том, о чём пишет.",
    })
}

pub async fn about_tech() -> Json<StaticPage> {
    Json(StaticPage {
        title: "Технологии",
        text: "Сервис построен на Rust: axum поверх tokio, PostgreSQL через sqlx, \
               Redis для кэша страниц и S3-совместимое хранилище для картинок.",
    })
}

pub async fn page_not_found(uri: Uri) -> AppError {
    AppError::not_found(uri.path())
}

// ---------------------------------------------------------------------------
// Signup / login / logout
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct SignupPayload {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

pub async fn signup_form() -> Json<FormPage> {
    Json(FormPage {
        form: signup_form_view("", "", "", "", FormErrors::default()),
        is_edit: None,
    })
}

pub async fn signup(
    State(state): State<AppState>,
    Form(payload): Form<SignupPayload>,
) -> Result<Response, AppError> {
    let first_name = payload.first_name.unwrap_or_default();
    let last_name = payload.last_name.unwrap_or_default();
    let username = payload.username.unwrap_or_default();
    let email = payload.email.unwrap_or_default();
    let password = payload.password.unwrap_or_default();

    let mut errors = FormErrors::default();
    if username.is_empty() {
        errors.add("username", REQUIRED_FIELD_MESSAGE);
    }
    if password.is_empty() {
        errors.add("password", REQUIRED_FIELD_MESSAGE);
    }
    if !errors.is_empty() {
        return Ok(Json(FormPage {
            form: signup_form_view(&first_name, &last_name, &username, &email, errors),
            is_edit: None,
        })
        .into_response());
    }

    let service = AuthService::new(state.db.clone(), state.session_key, state.session_ttl_days);
    match service
        .signup(username.clone(), email.clone(), first_name.clone(), last_name.clone(), password)
        .await
    {
        Ok(_) => Ok(Redirect::to("/auth/login/").into_response()),
        Err(err) => {
            if is_unique_violation(&err) {
                let mut errors = FormErrors::default();
                errors.add("username", USERNAME_TAKEN_MESSAGE);
                return Ok(Json(FormPage {
                    form: signup_form_view(&first_name, &last_name, &username, &email, errors),
                    is_edit: None,
                })
                .into_response());
            }
            tracing::error!(error = ?err, "failed to sign up user");
            Err(AppError::internal("failed to sign up"))
        }
    }
}

#[derive(Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginPayload {
    pub username: Option<String>,
    pub password: Option<String>,
    pub next: Option<String>,
}

pub async fn login_form(Query(query): Query<NextQuery>) -> Json<FormPage> {
    Json(FormPage {
        form: login_form_view("", query.next.as_deref().unwrap_or(""), FormErrors::default()),
        is_edit: None,
    })
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<NextQuery>,
    Form(payload): Form<LoginPayload>,
) -> Result<Response, AppError> {
    let username = payload.username.unwrap_or_default();
    let password = payload.password.unwrap_or_default();
    let next = payload.next.or(query.next);

    let service = AuthService::new(state.db.clone(), state.session_key, state.session_ttl_days);
    let session = service.login(&username, &password).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to log in");
        AppError::internal("failed to log in")
    })?;

    let session = match session {
        Some(session) => session,
        None => {
            let mut errors = FormErrors::default();
            errors.add("__all__", BAD_CREDENTIALS_MESSAGE);
            return Ok(Json(FormPage {
                form: login_form_view(&username, next.as_deref().unwrap_or(""), errors),
                is_edit: None,
            })
            .into_response());
        }
    };

    let cookie = Cookie::build((SESSION_COOKIE, session.token))
        .path("/")
        .http_only(true)
        .build();
    let target = safe_next(next.as_deref());
    Ok((jar.add(cookie), Redirect::to(target)).into_response())
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Result<Response, AppError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        let service =
            AuthService::new(state.db.clone(), state.session_key, state.session_ttl_days);
        if let Err(err) = service.logout(cookie.value()).await {
            tracing::error!(error = ?err, "failed to revoke session");
        }
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/").build());
    Ok((jar, Redirect::to("/")).into_response())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn json_body(body: String) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

fn redirect_to_post(post_id: Uuid) -> Response {
    Redirect::to(&format!("/posts/{}/", post_id)).into_response()
}

/// Unparseable ids behave like unknown ones: the URL names no post.
fn parse_post_id(raw: &str, path: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::not_found(path))
}

/// Redirect targets must stay on this site; anything else falls back to the
/// index.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(next) if next.starts_with('/') && !next.starts_with("//") => next,
        _ => "/",
    }
}

async fn resolve_group(
    state: &AppState,
    form: &PostForm,
    errors: &mut FormErrors,
) -> Result<Option<Uuid>, AppError> {
    let group_id = match form.validate(errors) {
        Some(group_id) => group_id,
        None => return Ok(None),
    };

    let group = GroupService::new(state.db.clone())
        .get(group_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, group_id = %group_id, "failed to fetch group");
            AppError::internal("failed to validate form")
        })?;

    match group {
        Some(group) => Ok(Some(group.id)),
        None => {
            errors.add("group", INVALID_GROUP_MESSAGE);
            Ok(None)
        }
    }
}

async fn store_image(state: &AppState, form: &PostForm) -> Result<Option<String>, AppError> {
    let upload = match &form.image {
        Some(upload) => upload,
        None => return Ok(None),
    };
    let key = state
        .storage
        .store_post_image(&upload.filename, upload.content_type.as_deref(), upload.data.clone())
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, filename = %upload.filename, "failed to store image");
            AppError::internal("failed to store image")
        })?;
    Ok(Some(key))
}

fn signup_form_view(
    first_name: &str,
    last_name: &str,
    username: &str,
    email: &str,
    errors: FormErrors,
) -> FormView {
    FormView {
        fields: vec![
            FormField {
                name: "first_name",
                label: "Имя",
                help_text: "",
                value: first_name.to_string(),
            },
            FormField {
                name: "last_name",
                label: "Фамилия",
                help_text: "",
                value: last_name.to_string(),
            },
            FormField {
                name: "username",
                label: "Имя пользователя",
                help_text: "",
                value: username.to_string(),
            },
            FormField {
                name: "email",
                label: "Адрес электронной почты",
                help_text: "",
                value: email.to_string(),
            },
            FormField {
                name: "password",
                label: "Пароль",
                help_text: "",
                value: String::new(),
            },
        ],
        errors,
    }
}

fn login_form_view(username: &str, next: &str, errors: FormErrors) -> FormView {
    FormView {
        fields: vec![
            FormField {
                name: "username",
                label: "Имя пользователя",
                help_text: "",
                value: username.to_string(),
            },
            FormField {
                name: "password",
                label: "Пароль",
                help_text: "",
                value: String::new(),
            },
            FormField {
                name: "next",
                label: "",
                help_text: "",
                value: next.to_string(),
            },
        ],
        errors,
    }
}

fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|err| err.as_database_error())
        .and_then(|err| err.code())
        .map(|code| code == "23505")
        .unwrap_or(false)
}
