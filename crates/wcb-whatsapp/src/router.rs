use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Router,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use wcb_core::{
    aggregator::{Aggregator, Outcome},
    audit::{AuditEvent, AuditLogger},
    config::Config,
    dispatcher::FlushDispatcher,
    domain::SenderId,
    events::InboundEvent,
    formatting::format_start_ack,
    ports::{CatalogPort, TransportPort},
    security::is_allowed_sender,
};

use crate::media::MediaFetchPort;
use crate::payload::{extract_messages, IncomingBody, IncomingMessage, WebhookPayload};

pub struct AppState {
    pub cfg: Arc<Config>,
    pub aggregator: Mutex<Aggregator>,
    pub dispatcher: FlushDispatcher,
    pub transport: Arc<dyn TransportPort>,
    pub catalog: Arc<dyn CatalogPort>,
    pub media: Arc<dyn MediaFetchPort>,
    pub sender_locks: SenderLocks,
    pub audit: AuditLogger,
}

/// Per-sender serialization: one sender's events are handled to
/// completion, in order, even when media downloads suspend in between.
/// Different senders may interleave freely; their state is sharded.
#[derive(Default)]
pub struct SenderLocks {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SenderLocks {
    pub async fn lock_sender(&self, sender: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(sender.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

/// Run the webhook server until it fails or the process is stopped.
pub async fn run_webhook(state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = state.cfg.webhook_addr.clone();

    tracing::info!("wcb webhook listening on {addr}");
    tracing::info!("allowed senders: {}", state.cfg.allowed_senders.len());
    tracing::info!("catalog endpoint: {}", state.cfg.catalog_submit_url);

    let app = Router::new()
        .route("/webhook", get(verify_webhook).post(receive_webhook))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Cloud API subscription handshake: echo `hub.challenge` when the mode
/// and verify token match, 403 otherwise.
async fn verify_webhook(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<String, StatusCode> {
    verification_response(&params, &state.cfg.wa_verify_token)
}

fn verification_response(
    params: &HashMap<String, String>,
    expected_token: &str,
) -> Result<String, StatusCode> {
    let mode = params.get("hub.mode").map(String::as_str);
    let token = params.get("hub.verify_token").map(String::as_str);
    let challenge = params.get("hub.challenge");

    match (mode, token, challenge) {
        (Some("subscribe"), Some(t), Some(c)) if t == expected_token => Ok(c.clone()),
        _ => Err(StatusCode::FORBIDDEN),
    }
}

/// Inbound notification endpoint.
///
/// Always answers 200: the Cloud API redelivers on anything else, and a
/// poison notification must not loop forever. The body is taken raw and
/// parsed by hand so a malformed payload cannot trip an extractor
/// rejection; unparseable bodies are logged and dropped.
async fn receive_webhook(State(state): State<Arc<AppState>>, body: Bytes) -> StatusCode {
    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "unparseable webhook payload dropped");
            return StatusCode::OK;
        }
    };

    for msg in extract_messages(&payload) {
        process_incoming(&state, msg).await;
    }

    StatusCode::OK
}

/// Audit-trail loss is never fatal, but it is always visible in the log.
fn audit_or_warn(audit: &AuditLogger, event: AuditEvent) {
    if let Err(e) = audit.write(event) {
        tracing::warn!(error = %e, "audit write failed");
    }
}

/// The full inbound pipeline for one message: allow-list gate, media
/// materialization, state machine transition, and outcome side effects.
pub async fn process_incoming(state: &AppState, msg: IncomingMessage) {
    let sender = msg.sender.clone();

    if !is_allowed_sender(&sender, &state.cfg.allowed_senders) {
        tracing::debug!(sender = %sender, "dropping event from unauthorized sender");
        audit_or_warn(&state.audit, AuditEvent::auth(&sender, false));
        return;
    }

    let _guard = state.sender_locks.lock_sender(sender.as_str()).await;

    match msg.body {
        IncomingBody::Text(text) => {
            audit_or_warn(&state.audit, AuditEvent::message(&sender, "text", &text));
            apply_event(state, InboundEvent::text(sender, &text)).await;
        }
        IncomingBody::Media {
            media_id,
            mime_type,
            caption,
        } => {
            let payload = match state.media.fetch(&media_id, &mime_type).await {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(sender = %sender, media_id, error = %e, "media dropped");
                    audit_or_warn(&state.audit, AuditEvent::error(Some(&sender), &e.to_string()));
                    return;
                }
            };

            audit_or_warn(
                &state.audit,
                AuditEvent::message(&sender, "media", &payload.mime_type),
            );
            apply_event(
                state,
                InboundEvent::media(sender.clone(), payload.bytes, payload.mime_type),
            )
            .await;

            // A caption rides along as a text line after its media.
            if let Some(c) = caption.filter(|c| !c.trim().is_empty()) {
                apply_event(state, InboundEvent::text(sender, &c)).await;
            }
        }
    }
}

async fn apply_event(state: &AppState, event: InboundEvent) {
    let sender = event.sender.clone();
    let outcome = {
        let mut agg = state.aggregator.lock().await;
        agg.handle(event)
    };

    match outcome {
        Outcome::Ignored(reason) => {
            tracing::debug!(sender = %sender, ?reason, "event ignored");
        }
        Outcome::MediaCollected {
            filename,
            started_draft,
        } => {
            tracing::info!(sender = %sender, filename, started_draft, "media collected");
        }
        Outcome::TextCollected => {
            tracing::debug!(sender = %sender, "text appended to draft");
        }
        Outcome::VendorSwitched { code, newly_seen } => {
            tracing::info!(sender = %sender, vendor = %code, newly_seen, "vendor switched");
            audit_or_warn(
                &state.audit,
                AuditEvent::vendor_switch(&sender, &code, newly_seen),
            );
            if newly_seen {
                // Fire-and-forget; a failed notification never undoes the
                // switch.
                if let Err(e) = state.catalog.register_vendor(&code).await {
                    tracing::warn!(vendor = %code, error = %e, "vendor notification failed");
                }
            }
        }
        Outcome::DraftStarted { discarded_previous } => {
            let vendor = {
                let agg = state.aggregator.lock().await;
                agg.active_vendor(&sender)
            };
            tracing::info!(sender = %sender, discarded_previous, "draft started");
            let ack = format_start_ack(&vendor, discarded_previous);
            if let Err(e) = state.transport.send_text(&sender, &ack).await {
                tracing::warn!(sender = %sender, error = %e, "start ack failed");
            }
        }
        Outcome::FlushReady(record) => {
            let vendor = record.vendor.clone();
            let images = record.images.len();
            let videos = record.videos.len();

            let result = state.dispatcher.flush(record).await;
            audit_or_warn(
                &state.audit,
                AuditEvent::flush(
                    &sender,
                    &vendor,
                    images,
                    videos,
                    result.is_ok(),
                    result.as_ref().err().map(|e| e.to_string()).as_deref(),
                ),
            );
        }
        Outcome::FlushSkippedEmpty => {
            tracing::info!(sender = %sender, "flush marker with empty description, draft kept open");
        }
    }
}
