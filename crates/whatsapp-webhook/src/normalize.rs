//! Mapping of provider messages onto the canonical message shape.

use chrono::{DateTime, TimeZone, Utc};
use database::MessageType;
use thiserror::Error;

use crate::payload::RawMessage;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("timestamp is not a whole number of seconds: {0:?}")]
    InvalidTimestamp(String),

    #[error("timestamp out of range: {0}")]
    TimestampOutOfRange(i64),
}

/// The single content variant of a message.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageContent {
    Text {
        body: String,
    },
    Image {
        media_id: String,
        caption: Option<String>,
    },
    Audio {
        media_id: String,
    },
    Video {
        media_id: String,
        caption: Option<String>,
    },
    Document {
        media_id: String,
        filename: Option<String>,
    },
    Location {
        latitude: f64,
        longitude: f64,
    },
    /// No content field this processor understands (stickers, reactions, ...).
    Unknown,
}

impl MessageContent {
    /// Pick the content variant of `message`.
    ///
    /// Precedence is text, image, audio, video, document, location; the first
    /// present field wins.
    pub fn resolve(message: &RawMessage) -> Self {
        if let Some(text) = &message.text {
            return MessageContent::Text {
                body: text.body.clone(),
            };
        }
        if let Some(image) = &message.image {
            return MessageContent::Image {
                media_id: image.id.clone(),
                caption: non_empty(&image.caption),
            };
        }
        if let Some(audio) = &message.audio {
            return MessageContent::Audio {
                media_id: audio.id.clone(),
            };
        }
        if let Some(video) = &message.video {
            return MessageContent::Video {
                media_id: video.id.clone(),
                caption: non_empty(&video.caption),
            };
        }
        if let Some(document) = &message.document {
            return MessageContent::Document {
                media_id: document.id.clone(),
                filename: non_empty(&document.filename),
            };
        }
        if let Some(location) = &message.location {
            return MessageContent::Location {
                latitude: location.latitude,
                longitude: location.longitude,
            };
        }
        MessageContent::Unknown
    }

    /// Stored message type. Unknown content is stored as text.
    pub fn message_type(&self) -> MessageType {
        match self {
            MessageContent::Text { .. } | MessageContent::Unknown => MessageType::Text,
            MessageContent::Image { .. } => MessageType::Image,
            MessageContent::Audio { .. } => MessageType::Audio,
            MessageContent::Video { .. } => MessageType::Video,
            MessageContent::Document { .. } => MessageType::Document,
            MessageContent::Location { .. } => MessageType::Location,
        }
    }

    /// Human-readable content shown in the conversation list.
    pub fn display_text(&self) -> String {
        match self {
            MessageContent::Text { body } => body.clone(),
            MessageContent::Image { caption, .. } => {
                caption.clone().unwrap_or_else(|| "Image".to_string())
            }
            MessageContent::Audio { .. } => "Audio message".to_string(),
            MessageContent::Video { caption, .. } => {
                caption.clone().unwrap_or_else(|| "Video".to_string())
            }
            MessageContent::Document { filename, .. } => {
                filename.clone().unwrap_or_else(|| "Document".to_string())
            }
            MessageContent::Location {
                latitude,
                longitude,
            } => format!("Location: {}, {}", latitude, longitude),
            MessageContent::Unknown => "Unknown message type".to_string(),
        }
    }

    /// Provider media id, for media messages.
    pub fn media_id(&self) -> Option<&str> {
        match self {
            MessageContent::Image { media_id, .. }
            | MessageContent::Audio { media_id }
            | MessageContent::Video { media_id, .. }
            | MessageContent::Document { media_id, .. } => Some(media_id.as_str()),
            MessageContent::Text { .. }
            | MessageContent::Location { .. }
            | MessageContent::Unknown => None,
        }
    }
}

/// Type, content and media reference derived from a provider message.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMessage {
    pub message_type: MessageType,
    pub content: String,
    pub media_url: Option<String>,
}

/// Derive the canonical fields of `message`.
pub fn normalize(message: &RawMessage) -> NormalizedMessage {
    let content = MessageContent::resolve(message);
    NormalizedMessage {
        message_type: content.message_type(),
        content: content.display_text(),
        media_url: content.media_id().map(str::to_string),
    }
}

/// Convert the provider's epoch-seconds string to a UTC instant.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, NormalizeError> {
    let seconds: i64 = raw
        .trim()
        .parse()
        .map_err(|_| NormalizeError::InvalidTimestamp(raw.to_string()))?;

    let millis = seconds
        .checked_mul(1000)
        .ok_or(NormalizeError::TimestampOutOfRange(seconds))?;

    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or(NormalizeError::TimestampOutOfRange(seconds))
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|s| !s.is_empty()).cloned()
}
