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
/// - **Authentication Errors**: Bad credentials or missing/expired sessions
/// - **Resource Errors**: Requested resources not found
/// - **Business Logic Errors**: Operations that violate the monthly surplus rule
/// - **Validation Errors**: Invalid request data or rejected CSV uploads
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    ///
    /// This wraps any sqlx::Error using the `#[from]` attribute, which
    /// automatically implements `From<sqlx::Error> for AppError`.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Username/password combination is wrong.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Session token is missing, invalid, or expired.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid session token")]
    InvalidSessionToken,

    /// Username is already registered.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("This username is already taken")]
    UsernameTaken,

    /// Email is already registered.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("This email is already registered")]
    EmailTaken,

    /// Requested income/expense record does not exist or doesn't belong to the
    /// authenticated user.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Record not found")]
    RecordNotFound,

    /// Requested recurring item does not exist or isn't owned by the user.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Recurring item not found")]
    RecurringNotFound,

    /// Requested budget does not exist or isn't owned by the user.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Budget not found")]
    BudgetNotFound,

    /// Requested savings goal does not exist or isn't owned by the user.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Savings goal not found")]
    GoalNotFound,

    /// Requested alert endpoint does not exist or isn't owned by the user.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Alert endpoint not found")]
    AlertNotFound,

    /// The month's income cannot cover this expense.
    ///
    /// Returns HTTP 422 Unprocessable Entity.
    #[error("No available income in that month to cover this expense")]
    InsufficientSurplus,

    /// An income change would leave recorded expenses uncovered.
    ///
    /// Returns HTTP 422 Unprocessable Entity.
    /// The String explains which totals would go out of balance.
    #[error("Income change rejected")]
    IncomeCoverage(String),

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    /// The String contains details about what was invalid.
    #[error("Invalid request")]
    InvalidRequest(String),

    /// Alert endpoint URL failed validation.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid alert URL")]
    InvalidAlertUrl(String),

    /// Uploaded CSV could not be processed as a whole (bad headers,
    /// oversized file, or a bank statement sent to the wrong endpoint).
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid CSV")]
    InvalidCsv(String),

    /// Unexpected internal failure (e.g., password hashing).
    ///
    /// Returns HTTP 500 Internal Server Error. Details are logged but
    /// never sent to the client.
    #[error("Internal error: {0}")]
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
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Map each error variant to (HTTP status, error code, message)
        let (status, code, message) = match self {
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                self.to_string(),
            ),
            AppError::InvalidSessionToken => (
                StatusCode::UNAUTHORIZED,
                "invalid_session_token",
                self.to_string(),
            ),
            AppError::UsernameTaken => (StatusCode::CONFLICT, "username_taken", self.to_string()),
            AppError::EmailTaken => (StatusCode::CONFLICT, "email_taken", self.to_string()),
            AppError::RecordNotFound => {
                (StatusCode::NOT_FOUND, "record_not_found", self.to_string())
            }
            AppError::RecurringNotFound => (
                StatusCode::NOT_FOUND,
                "recurring_not_found",
                self.to_string(),
            ),
            AppError::BudgetNotFound => {
                (StatusCode::NOT_FOUND, "budget_not_found", self.to_string())
            }
            AppError::GoalNotFound => (StatusCode::NOT_FOUND, "goal_not_found", self.to_string()),
            AppError::AlertNotFound => (StatusCode::NOT_FOUND, "alert_not_found", self.to_string()),
            AppError::InsufficientSurplus => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "insufficient_surplus",
                self.to_string(),
            ),
            AppError::IncomeCoverage(ref msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "income_coverage",
                msg.clone(),
            ),
            AppError::InvalidRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::InvalidAlertUrl(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_alert_url", msg.clone())
            }
            AppError::InvalidCsv(ref msg) => (StatusCode::BAD_REQUEST, "invalid_csv", msg.clone()),
            AppError::Database(_) | AppError::Internal(_) => {
                tracing::error!("Internal error: {:?}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
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
