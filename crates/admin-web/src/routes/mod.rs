//! Route handlers for the admin web server.

pub mod conversations;
pub mod health;
pub mod webhook;
pub mod whatsapp_config;

use axum::routing::{any, get};
use axum::Router;

use crate::state::AppState;

/// Build the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(health::health))
        // Provider-facing webhook; the dispatcher answers 405 itself
        .route(
            "/api/webhooks/whatsapp/:project_id",
            any(webhook::whatsapp_webhook),
        )
        // Admin API
        .route(
            "/api/projects/:project_id/whatsapp-config",
            get(whatsapp_config::get_config_api)
                .post(whatsapp_config::save_config_api)
                .delete(whatsapp_config::disable_config_api),
        )
        .route(
            "/api/projects/:project_id/conversations",
            get(conversations::list_conversations_api),
        )
        .route(
            "/api/projects/:project_id/conversations/:conversation_id/messages",
            get(conversations::list_messages_api),
        )
}
