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

use crate::store::StoreError;

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Validation Errors**: Malformed or unacceptable payloads; the caller must fix and resend
/// - **Resource Errors**: Referenced account or transaction is absent or owned by someone else
/// - **Authentication Errors**: Missing or rejected bearer token
/// - **Store Errors**: A remote call failed; earlier steps of the operation may already be committed
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    /// The String contains details about what was invalid.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Requested resource does not exist or doesn't belong to the caller.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Bearer token is missing, malformed or rejected.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("User not authenticated")]
    Unauthorized,

    /// A call to the remote store failed.
    ///
    /// Wraps any StoreError using `#[from]`. Returns HTTP 500, or 409 when
    /// a guarded write found the row changed and nothing was saved.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
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
///
/// # Status Code Mapping
///
/// - `Validation` → 400 Bad Request
/// - `Unauthorized` → 401 Unauthorized
/// - `NotFound` → 404 Not Found
/// - `Store(Conflict)` → 409 Conflict
/// - `Store` → 500 Internal Server Error (hides details from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg.clone()),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
            ),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            AppError::Store(StoreError::Conflict { .. }) => (
                StatusCode::CONFLICT,
                "conflict",
                "The record changed concurrently and nothing was saved, please retry".to_string(),
            ),
            AppError::Store(error) => {
                tracing::error!(%error, "store call failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "store_error",
                    "An internal error occurred".to_string(),
                )
            }
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

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(AppError::Validation("bad".into()), StatusCode::BAD_REQUEST)]
    #[case(AppError::NotFound("Account"), StatusCode::NOT_FOUND)]
    #[case(AppError::Unauthorized, StatusCode::UNAUTHORIZED)]
    #[case(AppError::Store(StoreError::Conflict { table: "accounts" }), StatusCode::CONFLICT)]
    #[case(
        AppError::Store(StoreError::Status { status: 503, message: "down".into() }),
        StatusCode::INTERNAL_SERVER_ERROR
    )]
    fn errors_map_to_status_codes(#[case] error: AppError, #[case] expected: StatusCode) {
        assert_eq!(error.into_response().status(), expected);
    }

    #[test]
    fn not_found_names_the_resource() {
        assert_eq!(AppError::NotFound("Transaction").to_string(), "Transaction not found");
    }
}
