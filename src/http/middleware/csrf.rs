use axum::extract::Request;
use axum::http::{HeaderName, Method};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use rand::distributions::Alphanumeric;
use rand::Rng;
use subtle::ConstantTimeEq;

use crate::http::AppError;

pub const CSRF_COOKIE: &str = "csrftoken";
const CSRF_HEADER: HeaderName = HeaderName::from_static("x-csrf-token");
const TOKEN_LEN: usize = 32;

/// Double-submit CSRF guard on every POST: the `csrftoken` cookie and the
/// `x-csrf-token` header must match. Responses to requests without the
/// cookie get a fresh token issued.
pub async fn csrf_guard(jar: CookieJar, request: Request, next: Next) -> Response {
    let cookie_token = jar.get(CSRF_COOKIE).map(|cookie| cookie.value().to_string());

    if request.method() == Method::POST {
        let header_token = request
            .headers()
            .get(&CSRF_HEADER)
            .and_then(|value| value.to_str().ok());

        let valid = match (cookie_token.as_deref(), header_token) {
            (Some(cookie), Some(header)) => {
                bool::from(cookie.as_bytes().ct_eq(header.as_bytes()))
            }
            _ => false,
        };

        if !valid {
            return AppError::csrf_failure().into_response();
        }
    }

    let had_cookie = cookie_token.is_some();
    let response = next.run(request).await;

    if had_cookie {
        return response;
    }

    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect();
    let cookie = Cookie::build((CSRF_COOKIE, token)).path("/").build();
    (jar.add(cookie), response).into_response()
}
