use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use crate::aggregator::DraftRecord;
use crate::formatting::{format_confirmation, format_submit_failure};
use crate::ports::{CatalogPort, Confirmation, ProductSubmission, SubmitError, TransportPort};

/// Takes a completed draft, submits it to the catalog, and relays the
/// outcome to the originating sender.
///
/// Delivery is at-most-once: the record is consumed regardless of how the
/// submission went. There is no retry and no durable queue; the sender is
/// always notified on failure so a lost product is at least visible.
pub struct FlushDispatcher {
    catalog: Arc<dyn CatalogPort>,
    transport: Arc<dyn TransportPort>,
    submit_timeout: Duration,
}

impl FlushDispatcher {
    pub fn new(
        catalog: Arc<dyn CatalogPort>,
        transport: Arc<dyn TransportPort>,
        submit_timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            transport,
            submit_timeout,
        }
    }

    /// Submit one record and reply to the sender. The returned result is
    /// informational; by the time it is produced the record is already
    /// consumed.
    pub async fn flush(&self, record: DraftRecord) -> Result<Confirmation, SubmitError> {
        let sender = record.sender.clone();
        let vendor = record.vendor.clone();
        let submission = ProductSubmission::from(record);

        tracing::info!(
            sender = %sender,
            vendor = %vendor,
            images = submission.images.len(),
            videos = submission.videos.len(),
            "submitting product to catalog"
        );

        let result = match timeout(
            self.submit_timeout,
            self.catalog.submit_product(&submission),
        )
        .await
        {
            Ok(r) => r,
            Err(_) => Err(SubmitError::Transport(format!(
                "submission timed out after {:?}",
                self.submit_timeout
            ))),
        };

        match &result {
            Ok(confirmation) => {
                tracing::info!(sender = %sender, "product submitted");
                if let Err(e) = self
                    .transport
                    .send_text(&sender, &format_confirmation(confirmation))
                    .await
                {
                    tracing::warn!(sender = %sender, error = %e, "failed to deliver confirmation");
                }
            }
            Err(err) => {
                tracing::warn!(sender = %sender, error = %err, "catalog submission failed, record dropped");
                if let Err(e) = self
                    .transport
                    .send_text(&sender, &format_submit_failure(err))
                    .await
                {
                    tracing::warn!(sender = %sender, error = %e, "failed to deliver failure notice");
                }
            }
        }

        result
    }
}
