use chrono::{DateTime, Utc};

use crate::domain::SenderId;

/// Raw media bytes plus the declared MIME type, as materialized by the
/// transport adapter. The core never fetches media itself.
#[derive(Clone, Debug)]
pub struct MediaPayload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl MediaPayload {
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// What a single inbound message carried.
#[derive(Clone, Debug)]
pub enum EventKind {
    Media(MediaPayload),
    Text(String),
    Empty,
}

/// Normalized representation of one transport message.
///
/// The state machine depends only on this shape, not on any transport
/// framing. Text is trimmed at construction so downstream logic never has
/// to re-trim.
#[derive(Clone, Debug)]
pub struct InboundEvent {
    pub sender: SenderId,
    pub kind: EventKind,
    pub received_at: DateTime<Utc>,
}

impl InboundEvent {
    pub fn text(sender: SenderId, body: &str) -> Self {
        Self {
            sender,
            kind: EventKind::Text(body.trim().to_string()),
            received_at: Utc::now(),
        }
    }

    pub fn media(sender: SenderId, bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            sender,
            kind: EventKind::Media(MediaPayload {
                bytes,
                mime_type: mime_type.into(),
            }),
            received_at: Utc::now(),
        }
    }

    pub fn empty(sender: SenderId) -> Self {
        Self {
            sender,
            kind: EventKind::Empty,
            received_at: Utc::now(),
        }
    }
}
