//! Error types for PostForge
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application-wide error type
///
/// This enum represents all possible errors that can occur
/// in the application. It implements `IntoResponse` to
/// automatically convert errors to appropriate HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Authentication required (401)
    #[error("Authentication required")]
    Unauthorized,

    /// Signature verification failed (401)
    #[error("Invalid signature")]
    InvalidSignature,

    /// Post record missing or not owned by the caller (404)
    #[error("Post not found")]
    PostNotFound,

    /// Validation error (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database error (500)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Automation webhook rejected the request (502)
    #[error("Upstream service error: {0}")]
    Upstream(String),

    /// HTTP client error (502)
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Post record update failed after a successful external publish (500)
    #[error("Post record update failed: {0}")]
    PublishState(String),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Encryption/signing error (500)
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Maps each error variant to appropriate HTTP status code and a
    /// JSON error body. Upstream and publish-state errors carry a short
    /// `details` string for diagnostics; bodies never include secrets,
    /// tokens, or backtraces.
    fn into_response(self) -> Response {
        use axum::Json;

        let (status, error_message, details, error_type) = match &self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Unauthorized. Please login first.".to_string(),
                None,
                "unauthorized",
            ),
            AppError::InvalidSignature => (
                StatusCode::UNAUTHORIZED,
                self.to_string(),
                None,
                "invalid_signature",
            ),
            AppError::PostNotFound => (
                StatusCode::NOT_FOUND,
                self.to_string(),
                Some("no post record owned by the caller was updated".to_string()),
                "post_not_found",
            ),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone(), None, "validation")
            }
            AppError::Upstream(details) => (
                StatusCode::BAD_GATEWAY,
                "Upstream service error".to_string(),
                Some(details.clone()),
                "upstream",
            ),
            AppError::HttpClient(err) => (
                StatusCode::BAD_GATEWAY,
                "Upstream service error".to_string(),
                Some(
                    if err.is_timeout() {
                        "upstream request timed out"
                    } else if err.is_connect() {
                        "upstream connection failed"
                    } else {
                        "upstream request failed"
                    }
                    .to_string(),
                ),
                "http_client",
            ),
            AppError::PublishState(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Post was published but its record was not updated".to_string(),
                Some(details.clone()),
                "publish_state",
            ),
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
                None,
                "database",
            ),
            AppError::Config(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone(), None, "config")
            }
            AppError::Encryption(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                msg.clone(),
                None,
                "encryption",
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                None,
                "internal",
            ),
        };

        // Record error metric
        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL
            .with_label_values(&[error_type, "unknown"])
            .inc();

        let body = match details {
            Some(details) => Json(serde_json::json!({
                "error": error_message,
                "details": details,
            })),
            None => Json(serde_json::json!({
                "error": error_message,
            })),
        };

        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
