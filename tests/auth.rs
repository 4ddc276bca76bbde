mod common;

use axum::http::{Method, StatusCode};
use uuid::Uuid;

#[tokio::test]
async fn signup_creates_the_account_and_redirects_to_login() {
    let app = common::app().await;
    let username = format!("newcomer_{}", &Uuid::new_v4().simple().to_string()[..8]);

    let response = app
        .post_form(
            "/auth/signup/",
            &[
                ("first_name", "Иван"),
                ("last_name", "Иванов"),
                ("username", &username),
                ("email", "ivan@example.com"),
                ("password", "verysecret123"),
            ],
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location.as_deref(), Some("/auth/login/"));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = $1")
        .bind(&username)
        .fetch_one(app.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);

    // And the fresh account can actually log in.
    let response = app
        .post_form(
            "/auth/login/",
            &[("username", &username), ("password", "verysecret123")],
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location.as_deref(), Some("/"));
}

#[tokio::test]
async fn signup_without_required_fields_rerenders_the_form() {
    let app = common::app().await;
    let response = app
        .post_form(
            "/auth/signup/",
            &[("username", ""), ("password", "")],
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let errors = response.json()["form"]["errors"].clone();
    assert_eq!(errors["username"][0], "Обязательное поле.");
    assert_eq!(errors["password"][0], "Обязательное поле.");
}

#[tokio::test]
async fn signup_with_a_taken_username_reports_the_conflict() {
    let app = common::app().await;
    let existing = app.create_user("signup_taken").await;

    let response = app
        .post_form(
            "/auth/signup/",
            &[
                ("username", &existing.username),
                ("password", "anotherpassword"),
            ],
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json()["form"]["errors"]["username"][0],
        "Пользователь с таким именем уже существует."
    );
}

#[tokio::test]
async fn login_sets_a_session_cookie() {
    let app = common::app().await;
    let user = app.create_user("login_cookie").await;

    let response = app
        .post_form(
            "/auth/login/",
            &[
                ("username", &user.username),
                ("password", common::DEFAULT_PASSWORD),
            ],
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location.as_deref(), Some("/"));
    assert!(response
        .set_cookies
        .iter()
        .any(|cookie| cookie.starts_with("session=") && cookie.contains("HttpOnly")));
}

#[tokio::test]
async fn login_honors_a_local_next_target() {
    let app = common::app().await;
    let user = app.create_user("login_next").await;

    let response = app
        .post_form(
            "/auth/login/",
            &[
                ("username", &user.username),
                ("password", common::DEFAULT_PASSWORD),
                ("next", "/create/"),
            ],
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location.as_deref(), Some("/create/"));
}

#[tokio::test]
async fn login_refuses_to_redirect_off_site() {
    let app = common::app().await;
    let user = app.create_user("login_offsite").await;

    for next in ["https://evil.example/", "//evil.example/"] {
        let response = app
            .post_form(
                "/auth/login/",
                &[
                    ("username", &user.username),
                    ("password", common::DEFAULT_PASSWORD),
                    ("next", next),
                ],
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::SEE_OTHER);
        assert_eq!(response.location.as_deref(), Some("/"), "next {}", next);
    }
}

#[tokio::test]
async fn bad_credentials_rerender_the_login_form() {
    let app = common::app().await;
    let user = app.create_user("login_bad").await;

    let response = app
        .post_form(
            "/auth/login/",
            &[("username", &user.username), ("password", "wrongpassword")],
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json()["form"]["errors"]["__all__"][0],
        "Неверное имя пользователя или пароль."
    );
}

#[tokio::test]
async fn logout_revokes_the_session() {
    let app = common::app().await;
    let user = app.create_user("logout").await;

    // The session works before logout.
    let response = app.get("/create/", Some(&user.session)).await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app
        .post_form("/auth/logout/", &[], Some(&user.session))
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location.as_deref(), Some("/"));

    // Afterwards the old cookie is just an anonymous visitor.
    let response = app.get("/create/", Some(&user.session)).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(
        response.location.as_deref(),
        Some("/auth/login/?next=%2Fcreate%2F")
    );
}

#[tokio::test]
async fn a_forged_session_cookie_is_ignored() {
    let app = common::app().await;
    let response = app.get("/create/", Some("v4.local.forged-token")).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(
        response.location.as_deref(),
        Some("/auth/login/?next=%2Fcreate%2F")
    );
}

// ---------------------------------------------------------------------------
// CSRF
// ---------------------------------------------------------------------------

#[tokio::test]
async fn posts_without_csrf_material_are_rejected() {
    let app = common::app().await;
    let user = app.create_user("csrf_missing").await;

    let response = app
        .post_form_without_csrf("/auth/logout/", &[], Some(&user.session))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error_message(), "CSRF verification failed");
}

#[tokio::test]
async fn mismatched_csrf_tokens_are_rejected() {
    let app = common::app().await;
    let response = app
        .request(
            Method::POST,
            "/auth/login/",
            Some((
                "application/x-www-form-urlencoded",
                b"username=a&password=b".to_vec(),
            )),
            &[
                ("cookie", "csrftoken=token-one"),
                ("x-csrf-token", "token-two"),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error_message(), "CSRF verification failed");
}

#[tokio::test]
async fn visitors_without_a_csrf_cookie_get_one_issued() {
    let app = common::app().await;
    let response = app.get("/about/author/", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response
        .set_cookies
        .iter()
        .any(|cookie| cookie.starts_with("csrftoken=")));
}

#[tokio::test]
async fn gets_never_require_a_csrf_token() {
    let app = common::app().await;
    let response = app
        .request(Method::GET, "/about/tech/", None, &[])
        .await;
    assert_eq!(response.status, StatusCode::OK);
}
