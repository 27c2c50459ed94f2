//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Authentication failures**: missing/invalid/expired keys, revoked
///   permissions, the global API toggle
/// - **Rate limiting**: sliding-window limit exceeded
/// - **Validation failures**: bad bulk-create requests
/// - **Resource errors**: admin operations on unknown keys
/// - **Infrastructure**: database, serialization and HTTP client errors
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (connection error, query error).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// No API key was supplied in the request headers.
    ///
    /// Returns HTTP 401 with code `missing_api_key`.
    #[error("API key is required")]
    MissingApiKey,

    /// The supplied key does not match any active credential.
    ///
    /// Returns HTTP 401 with code `authentication_failed`.
    #[error("Invalid API key or insufficient permissions")]
    InvalidApiKey,

    /// The key matched a credential whose expiry date has passed.
    ///
    /// Expiry is derived at auth time from `expires_at`, regardless of the
    /// stored status. Returns HTTP 401 with code `authentication_failed`.
    #[error("API key has expired")]
    KeyExpired,

    /// The key matched a credential without the `create_pages` permission.
    ///
    /// Returns HTTP 401 with code `authentication_failed`.
    #[error("API key does not have permission to create pages")]
    InsufficientPermissions,

    /// The credential exceeded its hourly request budget.
    ///
    /// Returns HTTP 429 with code `rate_limit_exceeded`.
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// The API is globally disabled in the runtime settings.
    ///
    /// Returns HTTP 403 with code `api_disabled`.
    #[error("The API is currently disabled")]
    ApiDisabled,

    /// Admin request without a valid admin token.
    ///
    /// Returns HTTP 401 with code `unauthorized`.
    #[error("Admin authorization required")]
    Unauthorized,

    /// Admin operation referenced a key that does not exist (or is not in
    /// the state the operation requires).
    ///
    /// Returns HTTP 404 with code `key_not_found`.
    #[error("API key not found")]
    KeyNotFound,

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 with code `invalid_data`.
    #[error("{0}")]
    InvalidData(String),

    /// The bulk-create batch exceeds the configured maximum.
    ///
    /// Returns HTTP 400 with code `too_many_pages`.
    #[error("Maximum {0} pages per request allowed")]
    TooManyPages(usize),

    /// Password hashing failed. Internal, never caused by request content.
    #[error("Credential hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    /// JSON serialization of internal state failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP client construction failed.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Convert `AppError` into an HTTP response.
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::MissingApiKey => {
                (StatusCode::UNAUTHORIZED, "missing_api_key", self.to_string())
            }
            AppError::InvalidApiKey
            | AppError::KeyExpired
            | AppError::InsufficientPermissions => (
                StatusCode::UNAUTHORIZED,
                "authentication_failed",
                self.to_string(),
            ),
            AppError::RateLimitExceeded => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limit_exceeded",
                self.to_string(),
            ),
            AppError::ApiDisabled => (StatusCode::FORBIDDEN, "api_disabled", self.to_string()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string()),
            AppError::KeyNotFound => (StatusCode::NOT_FOUND, "key_not_found", self.to_string()),
            AppError::InvalidData(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_data", msg.clone())
            }
            AppError::TooManyPages(_) => {
                (StatusCode::BAD_REQUEST, "too_many_pages", self.to_string())
            }
            AppError::Database(_)
            | AppError::Hash(_)
            | AppError::Serialization(_)
            | AppError::Http(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An internal error occurred".to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
