use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::aggregator::DraftRecord;
use crate::domain::{SenderId, VendorCode};
use crate::Result;

/// Outbound side of the chat transport: reply delivery only. Inbound
/// events are produced by the adapter and fed to the core directly.
#[async_trait]
pub trait TransportPort: Send + Sync {
    async fn send_text(&self, to: &SenderId, body: &str) -> Result<()>;
}

/// One media item on the submission wire.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaUpload {
    pub filename: String,
    pub base64: String,
    pub mimetype: String,
}

/// The catalog submission payload: one request per flushed draft.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProductSubmission {
    pub sender: String,
    pub vendor: String,
    pub description: String,
    pub images: Vec<MediaUpload>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub videos: Vec<MediaUpload>,
    /// ISO-8601, time of first contribution to the draft.
    pub timestamp: String,
}

impl From<DraftRecord> for ProductSubmission {
    fn from(record: DraftRecord) -> Self {
        let to_upload = |assets: Vec<crate::aggregator::MediaAsset>| {
            assets
                .into_iter()
                .map(|a| MediaUpload {
                    filename: a.filename,
                    base64: a.base64,
                    mimetype: a.mime_type,
                })
                .collect()
        };

        Self {
            sender: record.sender.0,
            vendor: record.vendor.as_str().to_string(),
            description: record.description,
            images: to_upload(record.images),
            videos: to_upload(record.videos),
            timestamp: record.created_at.to_rfc3339(),
        }
    }
}

/// Confirmation fields the catalog returns on a successful submission.
/// Everything is optional; the reply formatter fills gaps with a dash.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Confirmation {
    pub title: Option<String>,
    pub category: Option<String>,
    pub collections: Option<String>,
    pub price: Option<String>,
    pub compare_at_price: Option<String>,
    pub size: Option<String>,
    pub tags: Option<String>,
    pub sku: Option<String>,
    pub vendor: Option<String>,
    pub status: Option<String>,
}

/// Submission failure classes. Both are terminal for the record: there is
/// no retry and no durable queue (at-most-once delivery to the catalog).
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// The catalog answered but did not accept the product
    /// (validation failure, non-success status).
    #[error("catalog rejected submission: {0}")]
    Rejected(String),

    /// Network-level failure or deadline exceeded talking to the catalog.
    #[error("catalog transport failure: {0}")]
    Transport(String),
}

/// Outbound port to the catalog backend.
#[async_trait]
pub trait CatalogPort: Send + Sync {
    async fn submit_product(
        &self,
        submission: &ProductSubmission,
    ) -> std::result::Result<Confirmation, SubmitError>;

    /// Best-effort vendor notification. No real vendor object exists on
    /// the catalog side; failures here must never propagate into the
    /// vendor-switch transition.
    async fn register_vendor(&self, code: &VendorCode) -> Result<()>;
}
