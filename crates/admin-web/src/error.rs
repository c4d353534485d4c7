//! Error types for the admin web surface.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Errors that can occur in the admin web surface.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] database::DatabaseError),

    /// Automation error.
    #[error("Automation error: {0}")]
    Automation(#[from] automation::AutomationError),

    /// Malformed request input.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Database(database::DatabaseError::NotFound { .. }) => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            ApiError::Automation(automation::AutomationError::Database(
                database::DatabaseError::NotFound { .. },
            )) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Automation(automation::AutomationError::InvalidTransition { .. }) => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.to_string())
            }
            ApiError::Database(database::DatabaseError::Validation(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.to_string())
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            _ => {
                tracing::error!("Internal error: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

/// Result type for admin operations.
pub type Result<T> = std::result::Result<T, ApiError>;
