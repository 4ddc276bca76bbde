use axum::Router;

use crate::AppState;

mod auth;
mod error;
mod forms;
mod handlers;
pub mod middleware;
mod routes;

pub use auth::AuthUser;
pub use error::AppError;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::pages())
        .merge(routes::posts())
        .merge(routes::follows())
        .merge(routes::about())
        .merge(routes::auth())
        .fallback(handlers::page_not_found)
        .layer(axum::middleware::from_fn(middleware::csrf::csrf_guard))
        .with_state(state)
}
