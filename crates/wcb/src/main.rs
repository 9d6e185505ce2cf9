use std::sync::Arc;

use tokio::sync::Mutex;

use wcb_catalog::CatalogClient;
use wcb_core::{
    aggregator::Aggregator, audit::AuditLogger, commands::CommandGrammar, config::Config,
    dispatcher::FlushDispatcher, ports::{CatalogPort, TransportPort},
};
use wcb_whatsapp::{
    router::{self, AppState, SenderLocks},
    GraphMediaFetcher, WhatsAppMessenger,
};

#[tokio::main]
async fn main() -> Result<(), wcb_core::Error> {
    wcb_core::logging::init("wcb")?;

    let cfg = Arc::new(Config::load()?);

    let transport: Arc<dyn TransportPort> = Arc::new(WhatsAppMessenger::new(
        cfg.graph_api_base.clone(),
        cfg.wa_phone_number_id.clone(),
        cfg.wa_access_token.clone(),
    ));
    let catalog: Arc<dyn CatalogPort> = Arc::new(CatalogClient::new(
        cfg.catalog_submit_url.clone(),
        cfg.catalog_vendor_url.clone(),
        cfg.submit_timeout,
    ));
    let media = Arc::new(GraphMediaFetcher::new(
        cfg.graph_api_base.clone(),
        cfg.wa_access_token.clone(),
        cfg.media_timeout,
    ));

    let state = Arc::new(AppState {
        cfg: cfg.clone(),
        aggregator: Mutex::new(Aggregator::new(CommandGrammar::new(
            &cfg.flush_marker,
            &cfg.start_command,
        ))),
        dispatcher: FlushDispatcher::new(catalog.clone(), transport.clone(), cfg.submit_timeout),
        transport,
        catalog,
        media,
        sender_locks: SenderLocks::default(),
        audit: AuditLogger::new(cfg.audit_log_path.clone(), cfg.audit_log_json),
    });

    router::run_webhook(state)
        .await
        .map_err(|e| wcb_core::Error::External(format!("webhook server failed: {e}")))?;

    Ok(())
}
