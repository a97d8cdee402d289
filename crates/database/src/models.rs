//! Database models.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// WhatsApp Business API configuration for a project, with the access token
/// already opened.
#[derive(Clone, PartialEq, Eq)]
pub struct WhatsAppConfig {
    /// Project the configuration belongs to.
    pub project_id: String,
    /// App secret used to sign webhook deliveries. Plain text, in memory only.
    pub access_token: String,
    /// Token echoed by the provider during the subscription handshake.
    pub webhook_verify_token: String,
    /// WhatsApp Business account id.
    pub business_account_id: String,
    /// Phone number id receiving messages.
    pub phone_number_id: String,
    /// Whether the project finished setup.
    pub is_configured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for WhatsAppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WhatsAppConfig")
            .field("project_id", &self.project_id)
            .field("access_token", &"<redacted>")
            .field("webhook_verify_token", &"<redacted>")
            .field("business_account_id", &self.business_account_id)
            .field("phone_number_id", &self.phone_number_id)
            .field("is_configured", &self.is_configured)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

impl WhatsAppConfig {
    /// The access token with everything but the last four characters hidden.
    pub fn masked_access_token(&self) -> String {
        let chars: Vec<char> = self.access_token.chars().collect();
        let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
        format!("****{}", tail)
    }
}

/// Lifecycle state of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ConversationStatus {
    Active,
    Archived,
}

/// Kind of content carried by a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    Image,
    Audio,
    Video,
    Document,
    Location,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Image => "image",
            MessageType::Audio => "audio",
            MessageType::Video => "video",
            MessageType::Document => "document",
            MessageType::Location => "location",
        }
    }
}

/// Which side of the conversation sent a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum MessageDirection {
    Incoming,
    Outgoing,
}

/// Delivery state of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum MessageStatus {
    Sent,
    Delivered,
    Read,
    Failed,
}

/// A customer conversation within a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub project_id: String,
    /// Customer phone number, unique within the project.
    pub customer_phone: String,
    /// WhatsApp profile name, if the provider sent one.
    pub customer_name: Option<String>,
    /// Content of the most recent inbound message.
    pub last_message: String,
    #[serde(rename = "lastMessageTimestamp")]
    pub last_message_at: DateTime<Utc>,
    /// Incremented once per new inbound message.
    pub unread_count: i64,
    pub status: ConversationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub project_id: String,
    /// Provider-assigned id (`wamid.*`).
    #[serde(rename = "messageId")]
    pub whatsapp_message_id: String,
    pub from_phone: String,
    pub to_phone: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub content: String,
    /// Provider media id for image, audio, video and document messages.
    pub media_url: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub direction: MessageDirection,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
}

/// An inbound message ready to be folded into the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub project_id: String,
    pub whatsapp_message_id: String,
    pub from_phone: String,
    pub to_phone: String,
    pub customer_name: Option<String>,
    pub message_type: MessageType,
    pub content: String,
    pub media_url: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Result of recording an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOutcome {
    /// The conversation was created or updated and the message appended.
    Recorded {
        conversation_id: String,
        message_id: String,
    },
    /// The provider message id was already stored; nothing changed.
    Duplicate { conversation_id: String },
}

impl LedgerOutcome {
    pub fn conversation_id(&self) -> &str {
        match self {
            LedgerOutcome::Recorded { conversation_id, .. } => conversation_id,
            LedgerOutcome::Duplicate { conversation_id } => conversation_id,
        }
    }
}
