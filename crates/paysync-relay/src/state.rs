use std::sync::Arc;

use paysync::{BroadcastHub, TransactionStore};

/// Shared application state for the relay server.
///
/// Constructed once at startup and injected into handlers via
/// `web::Data`; nothing here is ambient or module-global.
pub struct AppState {
    /// The single authoritative transaction slot.
    pub store: TransactionStore,
    /// Connected SSE subscribers. `Arc` so per-connection guards can
    /// unsubscribe on disconnect.
    pub hub: Arc<BroadcastHub>,
    /// Shared merchant secret for webhook signature verification.
    /// Mandatory — the relay refuses to start without it.
    pub webhook_secret: Vec<u8>,
    /// Separate bearer token for the /metrics endpoint (not the webhook
    /// secret).
    pub metrics_token: Option<Vec<u8>>,
}
