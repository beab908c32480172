use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

const SERVER_SIDE_MESSAGE: &str = "Something went wrong on the server side";

/// HTTP-facing error. `detail` is the underlying cause; it is logged always
/// and returned to the client only when `expose` is set.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    MailDelivery { detail: String, expose: bool },
    Unavailable { detail: String, expose: bool },
    Internal { detail: String, expose: bool },
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::NotFound(msg) => write!(f, "Not Found: {msg}"),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {msg}"),
            AppError::MailDelivery { detail, .. } => write!(f, "Mail Delivery Failed: {detail}"),
            AppError::Unavailable { detail, .. } => write!(f, "Service Unavailable: {detail}"),
            AppError::Internal { detail, .. } => write!(f, "Internal Error: {detail}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, detail) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::MailDelivery { detail, expose } => {
                tracing::warn!("Failed to send email: {detail}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to send email".to_string(),
                    expose.then_some(detail),
                )
            }
            AppError::Unavailable { detail, expose } => {
                tracing::error!("Unexpected error: {detail}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    SERVER_SIDE_MESSAGE.to_string(),
                    expose.then_some(detail),
                )
            }
            AppError::Internal { detail, expose } => {
                tracing::error!("Internal error: {detail}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    SERVER_SIDE_MESSAGE.to_string(),
                    expose.then_some(detail),
                )
            }
        };

        let body = match detail {
            Some(error) => json!({ "message": message, "success": false, "error": error }),
            None => json!({ "message": message, "success": false }),
        };
        (status, axum::Json(body)).into_response()
    }
}
