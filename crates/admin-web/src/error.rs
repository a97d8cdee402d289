//! Error types for the admin API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use database::{DatabaseError, ValidationError};
use thiserror::Error;

/// Errors that can occur in the admin API.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Rejected request input.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Malformed query parameter.
    #[error("{0}")]
    BadRequest(String),

    /// Resource does not exist in the project.
    #[error("{0} not found")]
    NotFound(&'static str),
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AdminError::Database(DatabaseError::NotFound { entity, .. }) => {
                (StatusCode::NOT_FOUND, format!("{} not found", entity))
            }
            AdminError::Database(err) => {
                tracing::error!("Database error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AdminError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            AdminError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AdminError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

/// Result type for admin operations.
pub type Result<T> = std::result::Result<T, AdminError>;
