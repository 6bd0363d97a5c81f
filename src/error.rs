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
/// This enum represents all possible errors that can occur in the application.
/// Each variant maps to a specific HTTP status code and error message.
///
/// # Error Categories
///
/// - **Database Errors**: Any sqlx::Error from database operations
/// - **Authentication Errors**: Missing, expired, or undecodable bearer token
/// - **Authorization Errors**: Caller lacks an association with the target company
/// - **Resource Errors**: Requested resources not found
/// - **Validation Errors**: Invalid request data
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    ///
    /// This wraps any sqlx::Error using the `#[from]` attribute, which
    /// automatically implements `From<sqlx::Error> for AppError`.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Bearer token is missing, expired, or cannot be decoded.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Unauthorized")]
    Unauthorized,

    /// Caller has no association with the target company (or lacks the
    /// required role for the operation).
    ///
    /// Returns HTTP 403 Forbidden.
    /// The String explains which permission is missing.
    #[error("Forbidden")]
    Forbidden(String),

    /// Requested device does not exist.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Device not found")]
    DeviceNotFound,

    /// Requested company does not exist.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Company not found")]
    CompanyNotFound,

    /// A device with the given id is already registered.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("Device already exists")]
    DeviceExists(String),

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    /// The String contains details about what was invalid.
    #[error("Invalid request")]
    InvalidRequest(String),
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
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// # Status Code Mapping
///
/// - `Unauthorized` → 401 Unauthorized
/// - `Forbidden` → 403 Forbidden
/// - `DeviceNotFound` / `CompanyNotFound` → 404 Not Found
/// - `DeviceExists` → 409 Conflict
/// - `InvalidRequest` → 400 Bad Request
/// - `Database` → 500 Internal Server Error (hides details from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Map each error variant to (HTTP status, error code, message)
        let (status, code, message) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string()),
            AppError::Forbidden(ref msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            AppError::DeviceNotFound => {
                (StatusCode::NOT_FOUND, "device_not_found", self.to_string())
            }
            AppError::CompanyNotFound => {
                (StatusCode::NOT_FOUND, "company_not_found", self.to_string())
            }
            AppError::DeviceExists(ref id) => (
                StatusCode::CONFLICT,
                "device_exists",
                format!("Device with ID {id} already exists"),
            ),
            AppError::InvalidRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An internal error occurred".to_string(),
            ),
        };

        // Build JSON response body
        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        // Return the response with status code and JSON body
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::Unauthorized, StatusCode::UNAUTHORIZED),
            (
                AppError::Forbidden("nope".to_string()),
                StatusCode::FORBIDDEN,
            ),
            (AppError::DeviceNotFound, StatusCode::NOT_FOUND),
            (AppError::CompanyNotFound, StatusCode::NOT_FOUND),
            (
                AppError::DeviceExists("dev-1".to_string()),
                StatusCode::CONFLICT,
            ),
            (
                AppError::InvalidRequest("bad".to_string()),
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_database_error_hides_details() {
        let err = AppError::Database(sqlx::Error::PoolTimedOut);
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
