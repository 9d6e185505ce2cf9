//! WhatsApp Cloud API adapter.
//!
//! Implements the core `TransportPort` (text replies via the Graph API
//! `messages` endpoint) plus the inbound side: webhook parsing and media
//! download.

use async_trait::async_trait;

use wcb_core::{domain::SenderId, errors::Error, Result};

pub mod media;
pub mod payload;
pub mod router;

pub use media::{GraphMediaFetcher, MediaFetchPort};

#[derive(Clone)]
pub struct WhatsAppMessenger {
    http: reqwest::Client,
    graph_api_base: String,
    phone_number_id: String,
    access_token: String,
}

impl WhatsAppMessenger {
    pub fn new(
        graph_api_base: impl Into<String>,
        phone_number_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("reqwest client build");
        Self {
            http,
            graph_api_base: graph_api_base.into(),
            phone_number_id: phone_number_id.into(),
            access_token: access_token.into(),
        }
    }
}

#[async_trait]
impl wcb_core::ports::TransportPort for WhatsAppMessenger {
    async fn send_text(&self, to: &SenderId, body: &str) -> Result<()> {
        let url = format!("{}/{}/messages", self.graph_api_base, self.phone_number_id);
        let payload = serde_json::json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": to.as_str(),
            "type": "text",
            "text": { "body": body },
        });

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("whatsapp send failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Transport(format!(
                "whatsapp send rejected: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        Ok(())
    }
}