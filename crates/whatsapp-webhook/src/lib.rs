//! Inbound WhatsApp Cloud API webhook processing.
//!
//! This crate turns raw webhook requests into conversation ledger updates:
//!
//! - Subscription handshakes (`GET`) answered from the tenant's verify token
//! - HMAC-SHA256 verification of deliveries (`POST`) over the raw body
//! - Normalization of text, media and location messages
//! - Dispatch of each message to a [`ConversationLedger`]
//!
//! It is transport-neutral: the HTTP layer hands in method, headers, raw body
//! and query parameters and gets a [`WebhookResponse`] back.
//!
//! # Example
//!
//! ```no_run
//! use std::collections::HashMap;
//!
//! use database::{Database, SecretBoxCodec};
//! use http::{HeaderMap, Method};
//! use whatsapp_webhook::{Dispatcher, SqliteStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::connect("sqlite:whatsapp.db?mode=rwc").await?;
//! db.migrate().await?;
//! let codec = SecretBoxCodec::from_env("WHATSAPP_CONFIG_KEY")?;
//!
//! let dispatcher = Dispatcher::new(SqliteStore::new(db, codec));
//!
//! let body = br#"{"object":"whatsapp_business_account","entry":[]}"#;
//! let response = dispatcher
//!     .handle("project-1", &Method::POST, &HeaderMap::new(), body, &HashMap::new())
//!     .await;
//! println!("status: {}", response.status);
//! # Ok(())
//! # }
//! ```

pub mod challenge;
pub mod dispatcher;
pub mod error;
pub mod normalize;
pub mod payload;
pub mod response;
pub mod signature;
pub mod store;

pub use dispatcher::{DeliveryReport, Dispatcher};
pub use error::{ProcessingError, WebhookError};
pub use normalize::{normalize, parse_timestamp, MessageContent, NormalizeError, NormalizedMessage};
pub use payload::WebhookPayload;
pub use response::{ResponseBody, WebhookResponse};
pub use signature::{verify_signature, SIGNATURE_HEADER};
pub use store::{ConversationLedger, SqliteStore, TenantConfig, TenantConfigSource};
