use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Failure taxonomy for the translation pipeline. Each variant names the
/// stage that produced it, so callers can tell a dead spec URL from a
/// misbehaving embedding provider without parsing message strings.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Spec fetch failed: {0}")]
    Fetch(String),

    #[error("Spec parsing failed: {0}")]
    SpecParse(String),

    #[error("Embedding provider failed: {0}")]
    Embedding(String),

    #[error("Cache entry corrupt: {0}")]
    CacheCorrupt(String),

    #[error("Cache store failed: {0}")]
    Cache(String),

    #[error("No endpoints retrieved: {0}")]
    EmptyRetrieval(String),

    #[error("Endpoint selection failed: {0}")]
    Selection(String),

    #[error("Request construction failed: {0}")]
    Construction(String),

    #[error("Invalid input: {0}")]
    Validation(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: u16,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Fetch(msg) => {
                tracing::warn!(error = %msg, "Spec fetch error");
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            AppError::SpecParse(msg) => {
                tracing::warn!(error = %msg, "Spec parse error");
                (StatusCode::UNPROCESSABLE_ENTITY, self.to_string())
            }
            AppError::Embedding(msg) => {
                tracing::error!(error = %msg, "Embedding provider error");
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            AppError::CacheCorrupt(msg) => {
                tracing::error!(error = %msg, "Cache corruption");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::Cache(msg) => {
                tracing::error!(error = %msg, "Cache store error");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::EmptyRetrieval(msg) => {
                tracing::warn!(error = %msg, "Empty retrieval");
                (StatusCode::NOT_FOUND, self.to_string())
            }
            AppError::Selection(msg) => {
                tracing::error!(error = %msg, "Endpoint selection error");
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            AppError::Construction(msg) => {
                tracing::error!(error = %msg, "Request construction error");
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            AppError::Validation(msg) => {
                tracing::warn!(error = %msg, "Validation error");
                (StatusCode::BAD_REQUEST, msg.clone())
            }
        };

        let body = Json(ErrorResponse {
            error: message,
            code: status.as_u16(),
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
