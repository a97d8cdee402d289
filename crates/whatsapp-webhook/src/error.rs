//! Error types for webhook processing.

use database::DatabaseError;
use http::StatusCode;
use thiserror::Error;

use crate::response::WebhookResponse;

/// Errors that end a webhook request.
///
/// Each variant maps to the status the provider sees. Response bodies only
/// carry a short fixed message, never the underlying cause.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// No configuration for the project, or setup not finished.
    #[error("project {project_id} is not configured")]
    NotConfigured { project_id: String },

    /// Handshake with a `hub.mode` other than `subscribe`.
    #[error("invalid hub.mode: {0:?}")]
    InvalidMode(String),

    /// Handshake token does not match the stored verify token.
    #[error("verify token mismatch")]
    InvalidVerifyToken,

    /// Delivery signature missing or wrong.
    #[error("invalid webhook signature")]
    InvalidSignature,

    /// Neither GET nor POST.
    #[error("method not allowed: {0}")]
    MethodNotAllowed(http::Method),

    /// Store failure outside per-message processing.
    #[error("store error: {0}")]
    Store(#[from] DatabaseError),

    /// Every message of a delivery failed.
    #[error("all {failed} messages in the delivery failed")]
    AllMessagesFailed { failed: usize },
}

impl WebhookError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            WebhookError::NotConfigured { .. } | WebhookError::InvalidMode(_) => {
                StatusCode::BAD_REQUEST
            }
            WebhookError::InvalidVerifyToken | WebhookError::InvalidSignature => {
                StatusCode::FORBIDDEN
            }
            WebhookError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            WebhookError::Store(_) | WebhookError::AllMessagesFailed { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            WebhookError::NotConfigured { .. } => "Project not configured",
            WebhookError::InvalidMode(_) => "Invalid request",
            WebhookError::InvalidVerifyToken => "Invalid verify token",
            WebhookError::InvalidSignature => "Invalid signature",
            WebhookError::MethodNotAllowed(_) => "Method not allowed",
            WebhookError::Store(_) | WebhookError::AllMessagesFailed { .. } => {
                "Processing failed"
            }
        }
    }

    /// Response returned to the caller.
    pub fn to_response(&self) -> WebhookResponse {
        WebhookResponse::error(self.status(), self.public_message())
    }
}

/// Failure while processing a single message of a delivery.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("malformed message: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("message is missing {0}")]
    MissingField(&'static str),

    #[error("normalize error: {0}")]
    Normalize(#[from] crate::normalize::NormalizeError),

    #[error("store error: {0}")]
    Store(#[from] DatabaseError),
}
