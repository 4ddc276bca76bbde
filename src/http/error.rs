use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Boundary error for every handler. Domain failures are converted here and
/// rendered as JSON; nothing else leaks to the client.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    path: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            path: None,
        }
    }

    /// The 404 page carries the path that was requested.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: "page not found".to_string(),
            path: Some(path.into()),
        }
    }

    /// The generic permission-denied page.
    pub fn forbidden() -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: "permission denied".to_string(),
            path: None,
        }
    }

    /// Distinct body from the generic 403 so a CSRF rejection is
    /// recognizable.
    pub fn csrf_failure() -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: "CSRF verification failed".to_string(),
            path: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            path: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
            path: self.path,
        });
        (self.status, body).into_response()
    }
}
