//! WhatsApp Cloud API webhook payload shapes.
//!
//! Only the fields the bridge needs are modeled; everything else in the
//! notification is ignored. Unknown message types degrade to "nothing to
//! process" rather than a parse failure, because the Cloud API redelivers
//! on non-200 responses.

use serde::Deserialize;

use wcb_core::domain::SenderId;

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub value: ChangeValue,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub messages: Vec<RawMessage>,
}

/// A media attachment reference. Bytes are fetched separately via the
/// Graph API media endpoint.
#[derive(Debug, Deserialize)]
pub struct MediaRef {
    pub id: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TextBody {
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct RawMessage {
    pub from: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: Option<TextBody>,
    #[serde(default)]
    pub image: Option<MediaRef>,
    #[serde(default)]
    pub video: Option<MediaRef>,
    #[serde(default)]
    pub document: Option<MediaRef>,
    #[serde(default)]
    pub audio: Option<MediaRef>,
    #[serde(default)]
    pub sticker: Option<MediaRef>,
}

/// What one raw message normalizes to before media download.
#[derive(Debug)]
pub enum IncomingBody {
    Text(String),
    Media {
        media_id: String,
        mime_type: String,
        caption: Option<String>,
    },
}

#[derive(Debug)]
pub struct IncomingMessage {
    pub sender: SenderId,
    pub body: IncomingBody,
}

impl RawMessage {
    fn media_ref(&self) -> Option<&MediaRef> {
        self.image
            .as_ref()
            .or(self.video.as_ref())
            .or(self.document.as_ref())
            .or(self.audio.as_ref())
            .or(self.sticker.as_ref())
    }
}

/// Flatten a notification into normalized messages, in delivery order.
pub fn extract_messages(payload: &WebhookPayload) -> Vec<IncomingMessage> {
    let mut out = Vec::new();

    for entry in &payload.entry {
        for change in &entry.changes {
            for msg in &change.value.messages {
                let sender = SenderId(msg.from.clone());

                if let Some(media) = msg.media_ref() {
                    out.push(IncomingMessage {
                        sender: sender.clone(),
                        body: IncomingBody::Media {
                            media_id: media.id.clone(),
                            mime_type: media
                                .mime_type
                                .clone()
                                .unwrap_or_else(|| "application/octet-stream".into()),
                            caption: media.caption.clone(),
                        },
                    });
                    continue;
                }

                if let Some(text) = &msg.text {
                    if !text.body.trim().is_empty() {
                        out.push(IncomingMessage {
                            sender,
                            body: IncomingBody::Text(text.body.clone()),
                        });
                    }
                }
                // Reactions, locations, contacts and other types carry
                // nothing the aggregator can use; skip them.
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "object": "whatsapp_business_account",
        "entry": [{
            "id": "1031",
            "changes": [{
                "field": "messages",
                "value": {
                    "messaging_product": "whatsapp",
                    "metadata": {"display_phone_number": "1555", "phone_number_id": "2048"},
                    "messages": [
                        {
                            "from": "919999888777",
                            "id": "wamid.A==",
                            "timestamp": "1756300000",
                            "type": "image",
                            "image": {"id": "media-1", "mime_type": "image/jpeg", "sha256": "x"}
                        },
                        {
                            "from": "919999888777",
                            "id": "wamid.B==",
                            "timestamp": "1756300001",
                            "type": "text",
                            "text": {"body": "Red dress"}
                        }
                    ]
                }
            }]
        }]
    }"#;

    #[test]
    fn extracts_media_and_text_in_delivery_order() {
        let payload: WebhookPayload = serde_json::from_str(SAMPLE).unwrap();
        let msgs = extract_messages(&payload);

        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].sender.as_str(), "919999888777");
        match &msgs[0].body {
            IncomingBody::Media {
                media_id,
                mime_type,
                ..
            } => {
                assert_eq!(media_id, "media-1");
                assert_eq!(mime_type, "image/jpeg");
            }
            other => panic!("expected media, got {other:?}"),
        }
        match &msgs[1].body {
            IncomingBody::Text(t) => assert_eq!(t, "Red dress"),
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn status_only_notifications_produce_no_messages() {
        let payload: WebhookPayload = serde_json::from_str(
            r#"{"entry": [{"changes": [{"value": {"statuses": [{"id": "wamid.C=="}]}}]}]}"#,
        )
        .unwrap();
        assert!(extract_messages(&payload).is_empty());
    }

    #[test]
    fn media_without_mime_type_gets_a_fallback() {
        let payload: WebhookPayload = serde_json::from_str(
            r#"{"entry": [{"changes": [{"value": {"messages": [
                {"from": "S", "type": "document", "document": {"id": "d-1"}}
            ]}}]}]}"#,
        )
        .unwrap();
        let msgs = extract_messages(&payload);
        match &msgs[0].body {
            IncomingBody::Media { mime_type, .. } => {
                assert_eq!(mime_type, "application/octet-stream")
            }
            other => panic!("expected media, got {other:?}"),
        }
    }
}
