use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use url::form_urlencoded;

use crate::app::auth::AuthService;
use crate::AppState;

pub const SESSION_COOKIE: &str = "session";
pub const LOGIN_PATH: &str = "/auth/login/";

/// The viewer behind the session cookie. Extracting this on a route makes
/// the route login-required: anonymous requests are redirected to the login
/// page with `next` pointing back at the original URL.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: uuid::Uuid,
    pub username: String,
}

#[derive(Debug)]
pub struct LoginRedirect {
    next: String,
}

impl LoginRedirect {
    pub fn to(next: impl Into<String>) -> Self {
        Self { next: next.into() }
    }
}

impl IntoResponse for LoginRedirect {
    fn into_response(self) -> Response {
        let query: String = form_urlencoded::Serializer::new(String::new())
            .append_pair("next", &self.next)
            .finish();
        Redirect::to(&format!("{}?{}", LOGIN_PATH, query)).into_response()
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = LoginRedirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let next = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        let jar = CookieJar::from_headers(&parts.headers);
        let token = match jar.get(SESSION_COOKIE) {
            Some(cookie) => cookie.value().to_string(),
            None => return Err(LoginRedirect::to(next)),
        };

        let service = AuthService::new(
            state.db.clone(),
            state.session_key,
            state.session_ttl_days,
        );
        let session = match service.authenticate_session(&token).await {
            Ok(session) => session,
            Err(err) => {
                // A backend fault during auth is indistinguishable from an
                // anonymous request as far as the page contract goes.
                tracing::error!(error = ?err, "failed to resolve session");
                return Err(LoginRedirect::to(next));
            }
        };

        let session = session.ok_or_else(|| LoginRedirect::to(next))?;
        Ok(AuthUser {
            user_id: session.user_id,
            username: session.username,
        })
    }
}
