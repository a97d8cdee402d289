//! Webhook payload types from the WhatsApp Cloud API.
//!
//! Only the fields the processor reads are modeled; everything else in the
//! provider's JSON is ignored. Messages, contacts and statuses are kept as raw
//! JSON in the envelope and decoded one by one, so a single ill-typed item
//! cannot take its siblings down with it.

use serde::Deserialize;
use serde_json::Value;

/// `object` value for WhatsApp Business deliveries.
pub const WHATSAPP_BUSINESS_OBJECT: &str = "whatsapp_business_account";

/// `field` value of changes that carry messages and statuses.
pub const MESSAGES_FIELD: &str = "messages";

/// Top-level webhook body.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    /// Object type (e.g., "whatsapp_business_account").
    #[serde(default)]
    pub object: String,

    #[serde(default)]
    pub entry: Vec<Entry>,
}

/// One business account entry.
#[derive(Debug, Clone, Deserialize)]
pub struct Entry {
    /// Business account id.
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub changes: Vec<Change>,
}

/// A change notification.
#[derive(Debug, Clone, Deserialize)]
pub struct Change {
    /// Discriminator; only "messages" is processed.
    #[serde(default)]
    pub field: String,

    #[serde(default)]
    pub value: ChangeValue,
}

/// Payload of a "messages" change.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub messaging_product: Option<String>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Sender profiles for the messages in this change, see [`Contact`].
    #[serde(default)]
    pub contacts: Vec<Value>,

    /// Inbound messages, see [`RawMessage`].
    #[serde(default)]
    pub messages: Vec<Value>,

    /// Delivery receipts for outbound messages, see [`StatusUpdate`].
    #[serde(default)]
    pub statuses: Vec<Value>,
}

impl ChangeValue {
    /// Profile name of the contact whose `wa_id` is `phone`.
    ///
    /// Contacts that do not decode are skipped.
    pub fn contact_name(&self, phone: &str) -> Option<String> {
        self.contacts
            .iter()
            .filter_map(|contact| Contact::deserialize(contact).ok())
            .find(|contact| contact.wa_id == phone)
            .and_then(|contact| contact.profile)
            .map(|profile| profile.name)
            .filter(|name| !name.is_empty())
    }
}

/// Business phone number that received the change.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub phone_number_id: String,

    #[serde(default)]
    pub display_phone_number: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub wa_id: String,

    #[serde(default)]
    pub profile: Option<ContactProfile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactProfile {
    #[serde(default)]
    pub name: String,
}

/// An inbound message as sent by the provider.
///
/// Exactly one content field is expected to be present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMessage {
    /// Provider message id (`wamid.*`).
    #[serde(default)]
    pub id: String,

    /// Sender phone number.
    #[serde(default)]
    pub from: String,

    /// Epoch seconds, as a string.
    #[serde(default)]
    pub timestamp: String,

    /// Provider type tag. Informational; content resolution looks at the
    /// content fields.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub text: Option<TextContent>,

    #[serde(default)]
    pub image: Option<MediaContent>,

    #[serde(default)]
    pub audio: Option<MediaContent>,

    #[serde(default)]
    pub video: Option<MediaContent>,

    #[serde(default)]
    pub document: Option<MediaContent>,

    #[serde(default)]
    pub location: Option<LocationContent>,
}

impl RawMessage {
    /// Decode one entry of a change's `messages` array.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }

    /// Provider id of an entry that may not decode, for logging.
    pub fn id_of(value: &Value) -> &str {
        value.get("id").and_then(Value::as_str).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextContent {
    #[serde(default)]
    pub body: String,
}

/// Media reference shared by image, audio, video and document messages.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaContent {
    /// Provider media id.
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub caption: Option<String>,

    /// Documents only.
    #[serde(default)]
    pub filename: Option<String>,

    #[serde(default)]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationContent {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub address: Option<String>,
}

/// Delivery status of a message previously sent by the business.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub timestamp: String,

    #[serde(default)]
    pub recipient_id: String,
}

impl StatusUpdate {
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }
}
