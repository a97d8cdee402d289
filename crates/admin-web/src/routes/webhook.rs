//! WhatsApp Cloud API webhook endpoint.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Method};
use axum::response::{IntoResponse, Response};
use axum::Json;
use whatsapp_webhook::{ResponseBody, WebhookResponse};

use crate::state::AppState;

/// Handshake (`GET`) and delivery (`POST`) for one project.
///
/// The body is taken as raw bytes so the signature is checked against
/// exactly what the provider sent.
pub async fn whatsapp_webhook(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    method: Method,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let response = state
        .dispatcher
        .handle(&project_id, &method, &headers, &body, &query)
        .await;
    into_http(response)
}

fn into_http(response: WebhookResponse) -> Response {
    match response.body {
        ResponseBody::Text(text) => (response.status, text).into_response(),
        ResponseBody::Json(value) => (response.status, Json(value)).into_response(),
    }
}
