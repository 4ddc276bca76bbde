use axum::{routing::get, routing::post, Router};

use crate::http::handlers;
use crate::AppState;

pub fn pages() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::index))
        .route("/group/:slug/", get(handlers::group_posts))
        .route("/profile/:username/", get(handlers::profile))
        .route("/posts/:id/", get(handlers::post_detail))
}

pub fn posts() -> Router<AppState> {
    Router::new()
        .route(
            "/create/",
            get(handlers::post_create_form).post(handlers::post_create),
        )
        .route(
            "/posts/:id/edit/",
            get(handlers::post_edit_form).post(handlers::post_edit),
        )
        .route("/posts/:id/comment/", post(handlers::add_comment))
}

pub fn follows() -> Router<AppState> {
    Router::new()
        .route("/follow/", get(handlers::follow_index))
        .route("/profile/:username/follow/", get(handlers::profile_follow))
        .route(
            "/profile/:username/unfollow/",
            get(handlers::profile_unfollow),
        )
}

pub fn about() -> Router<AppState> {
    Router::new()
        .route("/about/author/", get(handlers::about_author))
        .route("/about/tech/", get(handlers::about_tech))
}

pub fn auth() -> Router<AppState> {
    Router::new()
        .route(
            "/auth/signup/",
            get(handlers::signup_form).post(handlers::signup),
        )
        .route(
            "/auth/login/",
            get(handlers::login_form).post(handlers::login),
        )
        .route("/auth/logout/", post(handlers::logout))
}
