//! Graph API media download.
//!
//! Cloud API media is a two-step fetch: resolve the media id to a signed
//! URL, then download the bytes from that URL (both with the bearer
//! token). A failure at either step drops the event upstream; it never
//! reaches the state machine.

use async_trait::async_trait;
use serde::Deserialize;

use wcb_core::{errors::Error, events::MediaPayload, Result};

/// Seam for tests: the router depends on this trait, not on reqwest.
#[async_trait]
pub trait MediaFetchPort: Send + Sync {
    /// Materialize media bytes for an attachment reference. The declared
    /// MIME type from the webhook is a fallback if the lookup carries a
    /// more specific one.
    async fn fetch(&self, media_id: &str, declared_mime: &str) -> Result<MediaPayload>;
}

pub struct GraphMediaFetcher {
    http: reqwest::Client,
    graph_api_base: String,
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct MediaLookup {
    url: String,
    #[serde(default)]
    mime_type: Option<String>,
}

impl GraphMediaFetcher {
    pub fn new(
        graph_api_base: impl Into<String>,
        access_token: impl Into<String>,
        timeout: std::time::Duration,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client build");
        Self {
            http,
            graph_api_base: graph_api_base.into(),
            access_token: access_token.into(),
        }
    }
}

#[async_trait]
impl MediaFetchPort for GraphMediaFetcher {
    async fn fetch(&self, media_id: &str, declared_mime: &str) -> Result<MediaPayload> {
        let lookup_url = format!("{}/{}", self.graph_api_base, media_id);
        let lookup: MediaLookup = self
            .http
            .get(&lookup_url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| Error::MediaDownload(format!("media lookup failed: {e}")))?
            .error_for_status()
            .map_err(|e| Error::MediaDownload(format!("media lookup rejected: {e}")))?
            .json()
            .await
            .map_err(|e| Error::MediaDownload(format!("media lookup body: {e}")))?;

        let bytes = self
            .http
            .get(&lookup.url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| Error::MediaDownload(format!("media download failed: {e}")))?
            .error_for_status()
            .map_err(|e| Error::MediaDownload(format!("media download rejected: {e}")))?
            .bytes()
            .await
            .map_err(|e| Error::MediaDownload(format!("media download body: {e}")))?;

        if bytes.is_empty() {
            return Err(Error::MediaDownload(format!(
                "media {media_id} resolved to an empty payload"
            )));
        }

        Ok(MediaPayload {
            bytes: bytes.to_vec(),
            mime_type: lookup
                .mime_type
                .unwrap_or_else(|| declared_mime.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_lookup_parses_graph_response() {
        let lookup: MediaLookup = serde_json::from_str(
            r#"{
                "url": "https://lookaside.example/media/abc",
                "mime_type": "image/jpeg",
                "sha256": "x",
                "file_size": 12345,
                "id": "media-1"
            }"#,
        )
        .unwrap();
        assert_eq!(lookup.url, "https://lookaside.example/media/abc");
        assert_eq!(lookup.mime_type.as_deref(), Some("image/jpeg"));
    }
}
