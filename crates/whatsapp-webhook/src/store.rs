//! Persistence seams used by the dispatcher.

use async_trait::async_trait;
use database::{
    conversation, whatsapp_config, Database, LedgerOutcome, NewMessage, SecretBoxCodec,
    WhatsAppConfig,
};

/// Per-tenant configuration as seen by the webhook processor.
pub type TenantConfig = WhatsAppConfig;

/// Lookup of tenant configuration and its shared secret.
#[async_trait]
pub trait TenantConfigSource: Send + Sync {
    /// Load the configuration for a project, with the secret opened.
    async fn load_tenant_config(&self, project_id: &str) -> database::Result<Option<TenantConfig>>;
}

/// Owner of the conversation/message invariants.
#[async_trait]
pub trait ConversationLedger: Send + Sync {
    /// Create or update the customer's conversation and append the message
    /// as one unit of work.
    async fn record_inbound(&self, message: &NewMessage) -> database::Result<LedgerOutcome>;
}

/// SQLite-backed implementation of both seams.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: Database,
    codec: SecretBoxCodec,
}

impl SqliteStore {
    pub fn new(db: Database, codec: SecretBoxCodec) -> Self {
        Self { db, codec }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl TenantConfigSource for SqliteStore {
    async fn load_tenant_config(&self, project_id: &str) -> database::Result<Option<TenantConfig>> {
        whatsapp_config::get_config(self.db.pool(), &self.codec, project_id).await
    }
}

#[async_trait]
impl ConversationLedger for SqliteStore {
    async fn record_inbound(&self, message: &NewMessage) -> database::Result<LedgerOutcome> {
        conversation::record_inbound_message(self.db.pool(), message).await
    }
}
