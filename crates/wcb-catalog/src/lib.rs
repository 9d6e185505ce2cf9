//! Catalog adapter.
//!
//! Implements the core `CatalogPort` over the downstream catalog's HTTP
//! API: one POST per flushed product, plus a best-effort vendor
//! notification. Any `status != "success"` in the response body counts as
//! a rejection, not a crash.

use async_trait::async_trait;
use serde::Deserialize;

use wcb_core::{
    domain::VendorCode,
    ports::{CatalogPort, Confirmation, ProductSubmission, SubmitError},
    Result,
};

#[derive(Clone, Debug)]
pub struct CatalogClient {
    submit_url: String,
    vendor_url: Option<String>,
    http: reqwest::Client,
}

/// Response envelope from the catalog.
#[derive(Debug, Deserialize)]
struct CatalogResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    product: Option<Confirmation>,
}

impl CatalogClient {
    pub fn new(
        submit_url: impl Into<String>,
        vendor_url: Option<String>,
        timeout: std::time::Duration,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client build");
        Self {
            submit_url: submit_url.into(),
            vendor_url,
            http,
        }
    }
}

#[async_trait]
impl CatalogPort for CatalogClient {
    async fn submit_product(
        &self,
        submission: &ProductSubmission,
    ) -> std::result::Result<Confirmation, SubmitError> {
        let resp = self
            .http
            .post(&self.submit_url)
            .json(submission)
            .send()
            .await
            .map_err(|e| SubmitError::Transport(e.to_string()))?;

        let http_status = resp.status();
        let body: CatalogResponse = match resp.json().await {
            Ok(b) => b,
            Err(e) if http_status.is_success() => {
                return Err(SubmitError::Transport(format!(
                    "catalog returned unreadable body: {e}"
                )));
            }
            Err(_) => {
                return Err(SubmitError::Rejected(format!("HTTP {http_status}")));
            }
        };

        if !http_status.is_success() || body.status != "success" {
            let detail = body
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| format!("HTTP {http_status}, status={:?}", body.status));
            return Err(SubmitError::Rejected(detail));
        }

        Ok(body.product.unwrap_or_default())
    }

    async fn register_vendor(&self, code: &VendorCode) -> Result<()> {
        // No real vendor-creation API exists on the catalog side. When no
        // endpoint is configured this stays a local log line.
        let Some(url) = &self.vendor_url else {
            tracing::info!(vendor = %code, "vendor registered (local tracking only)");
            return Ok(());
        };

        let payload = serde_json::json!({ "vendor": code.as_str() });
        match self.http.post(url).json(&payload).send().await {
            Ok(resp) if resp.status().is_success() => {
                tracing::info!(vendor = %code, "vendor registered with catalog");
            }
            Ok(resp) => {
                tracing::warn!(vendor = %code, status = %resp.status(), "vendor notification rejected");
            }
            Err(e) => {
                tracing::warn!(vendor = %code, error = %e, "vendor notification failed");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_envelope_parses_success_shape() {
        let body: CatalogResponse = serde_json::from_str(
            r#"{
                "status": "success",
                "product": {
                    "title": "Red Dress",
                    "price": "1499",
                    "sku": "AB12C",
                    "vendor": "ACME"
                }
            }"#,
        )
        .unwrap();

        assert_eq!(body.status, "success");
        let p = body.product.unwrap();
        assert_eq!(p.title.as_deref(), Some("Red Dress"));
        assert_eq!(p.sku.as_deref(), Some("AB12C"));
    }

    #[test]
    fn response_envelope_parses_failure_shape() {
        let body: CatalogResponse =
            serde_json::from_str(r#"{"status": "error", "message": "Description is required"}"#)
                .unwrap();
        assert_eq!(body.status, "error");
        assert_eq!(body.message.as_deref(), Some("Description is required"));
        assert!(body.product.is_none());
    }

    #[test]
    fn response_envelope_tolerates_missing_fields() {
        let body: CatalogResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(body.status, "");
        assert!(body.message.is_none());
    }
}
