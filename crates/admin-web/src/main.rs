//! HTTP server for the WhatsApp integration.
//!
//! Receives WhatsApp Cloud API webhooks per project and exposes a JSON API
//! for managing the integration and browsing conversations.

mod config;
mod error;
mod routes;
mod state;

use database::{Database, SecretBoxCodec};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(addr = %config.addr, "Starting admin web server");

    let codec = SecretBoxCodec::from_key_str(&config.config_key)?;

    // Connect to database
    let db = Database::connect_with_pool_size(&config.database_url, config.database_pool_size)
        .await?;
    db.migrate().await?;

    // Build application state
    let state = AppState::new(db, codec);

    // Build router
    let app = routes::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    info!(addr = %config.addr, "Admin web server listening");
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
