//! SQLite persistence layer for the WhatsApp conversation ledger.
//!
//! This crate provides async database operations for per-project WhatsApp
//! configuration, conversations and messages using SQLx with SQLite.
//!
//! # Example
//!
//! ```no_run
//! use database::{conversation, whatsapp_config, Database, SecretBoxCodec};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:whatsapp.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     let codec = SecretBoxCodec::from_env("WHATSAPP_CONFIG_KEY")?;
//!     if let Some(config) = whatsapp_config::get_config(db.pool(), &codec, "project-1").await? {
//!         println!("phone number id: {}", config.phone_number_id);
//!     }
//!
//!     let recent = conversation::list_conversations(db.pool(), "project-1", 20, None).await?;
//!     println!("{} conversations", recent.len());
//!
//!     Ok(())
//! }
//! ```

pub mod conversation;
pub mod crypto;
pub mod error;
pub mod message;
pub mod models;
pub mod validation;
pub mod whatsapp_config;

pub use conversation::ConversationCursor;
pub use crypto::{CryptoError, SecretBoxCodec};
pub use error::{DatabaseError, Result};
pub use models::{
    Conversation, ConversationStatus, LedgerOutcome, Message, MessageDirection, MessageStatus,
    MessageType, NewMessage, WhatsAppConfig,
};
pub use validation::{ValidationError, WhatsAppConfigInput};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    /// Set high enough to absorb concurrent webhook deliveries.
    pub const DEFAULT_POOL_SIZE: u32 = 20;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `?mode=rwc` to create the database file if it doesn't exist.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example() -> database::Result<()> {
    /// // File database
    /// let db = database::Database::connect("sqlite:data/whatsapp.db?mode=rwc").await?;
    ///
    /// // In-memory database (for testing, keep a single connection)
    /// let db = database::Database::connect_with_pool_size("sqlite::memory:", 1).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!(
            "Connected to database: {} (pool size: {})",
            url,
            pool_size
        );

        Ok(Self { pool })
    }

    /// Run database migrations.
    ///
    /// This should be called once after connecting to ensure the schema is up to date.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
