//! Application state shared across handlers.

use std::sync::Arc;

use database::{Database, SecretBoxCodec};
use whatsapp_webhook::{Dispatcher, SqliteStore};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection.
    pub db: Database,
    /// Codec for sealing stored access tokens.
    pub codec: SecretBoxCodec,
    /// Webhook pipeline for all projects.
    pub dispatcher: Arc<Dispatcher<SqliteStore>>,
}

impl AppState {
    /// Create new application state.
    pub fn new(db: Database, codec: SecretBoxCodec) -> Self {
        let dispatcher = Dispatcher::new(SqliteStore::new(db.clone(), codec.clone()));
        Self {
            db,
            codec,
            dispatcher: Arc::new(dispatcher),
        }
    }
}
