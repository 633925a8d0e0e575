//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.
//!
//! Note that "already processed" payment replays are NOT an error: they are
//! a normal outcome (`services::payments::PaymentOutcome::AlreadyProcessed`)
//! and never pass through this type.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// Each variant maps to a specific HTTP status code and error kind.
///
/// # Error Categories
///
/// - **Database Errors**: Any sqlx::Error from database operations
/// - **Authentication Errors**: missing/invalid identity or key, ownership
///   mismatch, inactive or expired key, bad payment signatures
/// - **Validation Errors**: malformed request bodies or fields
/// - **Business Rule Errors**: duplicate first-key creation
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    ///
    /// This wraps any sqlx::Error using the `#[from]` attribute, which
    /// automatically implements `From<sqlx::Error> for AppError`.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Identity or API key proof failed. The message is the first failing
    /// check; later checks are never evaluated.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("{0}")]
    Unauthorized(String),

    /// A payment or webhook signature did not match the shared secret.
    ///
    /// Surfaced as an Unauthorized-class rejection (HTTP 401); the call
    /// site logs the event identifier for audit.
    #[error("Invalid signature")]
    SignatureInvalid,

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("{0}")]
    Validation(String),

    /// Operation violates a non-retryable business rule, e.g. creating a
    /// first key when an active key already exists.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("{0}")]
    Conflict(String),

    /// Unexpected internal failure, including upstream provider errors.
    ///
    /// Returns HTTP 500 with a generic message; detail stays in the logs.
    #[error("{0}")]
    Internal(String),
}

/// Convert AppError into an HTTP response.
///
/// This implementation allows Axum handlers to return `Result<T, AppError>`
/// and have errors automatically converted to proper HTTP responses.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": "Unauthorized",
///   "message": "API key expired"
/// }
/// ```
///
/// # Status Code Mapping
///
/// - `Unauthorized`, `SignatureInvalid` → 401 Unauthorized
/// - `Validation` → 400 Bad Request
/// - `Conflict` → 409 Conflict
/// - `Database`, `Internal` → 500 Internal Server Error (hides details from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Map each error variant to (HTTP status, error kind, message)
        let (status, kind, message) = match self {
            AppError::Unauthorized(ref msg) => {
                (StatusCode::UNAUTHORIZED, "Unauthorized", msg.clone())
            }
            AppError::SignatureInvalid => (
                StatusCode::UNAUTHORIZED,
                "Unauthorized",
                "Invalid signature".to_string(),
            ),
            AppError::Validation(ref msg) => {
                (StatusCode::BAD_REQUEST, "ValidationError", msg.clone())
            }
            AppError::Conflict(ref msg) => (StatusCode::CONFLICT, "Conflict", msg.clone()),
            AppError::Database(ref err) => {
                // Full detail stays server-side
                tracing::error!(error = %err, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DatabaseError",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Internal(ref msg) => {
                tracing::error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "InternalError",
                    "Internal server error".to_string(),
                )
            }
        };

        // Build JSON response body
        let body = Json(json!({
            "error": kind,
            "message": message
        }));

        (status, body).into_response()
    }
}
