//! Transport-neutral webhook responses.

use http::StatusCode;
use serde_json::{json, Value};

/// Body of a webhook response.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Sent verbatim as `text/plain`.
    Text(String),
    /// Sent as `application/json`.
    Json(Value),
}

/// Status and body the HTTP layer should return to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookResponse {
    pub status: StatusCode,
    pub body: ResponseBody,
}

impl WebhookResponse {
    /// 200 with `{"success": true}`.
    pub fn success() -> Self {
        Self {
            status: StatusCode::OK,
            body: ResponseBody::Json(json!({ "success": true })),
        }
    }

    /// 200 with a raw text body.
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            body: ResponseBody::Text(body.into()),
        }
    }

    /// Minimal JSON error body.
    pub fn error(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            body: ResponseBody::Json(json!({ "error": message })),
        }
    }
}
