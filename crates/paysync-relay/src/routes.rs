use std::sync::Arc;

use actix_web::{get, post, web, HttpRequest, HttpResponse};
use futures::StreamExt;
use uuid::Uuid;

use paysync::{signature, BroadcastHub, Event, SignatureHeader};

use crate::metrics;
use crate::state::AppState;

/// Header carrying `timestamp=<ts>,signature=<hex>` on provider callbacks.
pub const SIGNATURE_HEADER: &str = "X-Payment-Signature";

/// Broadcast a best-effort `error` event. Failures on the ingress path are
/// answered over HTTP either way; this just lets real-time clients see the
/// rejection too.
fn publish_error(state: &AppState, reason: &str) {
    metrics::EVENTS_PUBLISHED.with_label_values(&["error"]).inc();
    state.hub.publish("error", serde_json::json!(reason));
}

#[post("/transaction-callback")]
pub async fn transaction_callback(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Bytes,
) -> HttpResponse {
    // The raw bytes are what the provider signed; the body is parsed only
    // after the signature checks out.
    let header_value = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let Some(header_value) = header_value else {
        tracing::warn!("webhook rejected — no signature header");
        metrics::CALLBACK_REQUESTS
            .with_label_values(&["missing_signature"])
            .inc();
        publish_error(&state, "Missing signature");
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "Missing signature"
        }));
    };

    let header = match SignatureHeader::parse(header_value) {
        Ok(header) => header,
        Err(_) => {
            tracing::warn!("webhook rejected — malformed signature header");
            metrics::CALLBACK_REQUESTS
                .with_label_values(&["malformed_header"])
                .inc();
            publish_error(&state, "Malformed signature header");
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Malformed signature header"
            }));
        }
    };

    if signature::verify(&state.webhook_secret, &header, &body).is_err() {
        tracing::warn!("webhook rejected — signature mismatch");
        metrics::CALLBACK_REQUESTS
            .with_label_values(&["invalid_signature"])
            .inc();
        publish_error(&state, "Invalid signature");
        return HttpResponse::Forbidden().json(serde_json::json!({
            "error": "Invalid signature"
        }));
    }

    let fields: serde_json::Map<String, serde_json::Value> = match serde_json::from_slice(&body) {
        Ok(fields) => fields,
        Err(e) => {
            tracing::warn!(error = %e, "webhook rejected — body is not a JSON object");
            metrics::CALLBACK_REQUESTS
                .with_label_values(&["invalid_body"])
                .inc();
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Invalid JSON body"
            }));
        }
    };

    // Commit first, then broadcast: anyone who sees the event also sees
    // the record on a concurrent poll.
    let record = state.store.commit(fields);
    let payload = serde_json::to_value(&record).unwrap_or_default();
    let delivered = state.hub.publish("transaction_update", payload);

    metrics::CALLBACK_REQUESTS
        .with_label_values(&["accepted"])
        .inc();
    metrics::EVENTS_PUBLISHED
        .with_label_values(&["transaction_update"])
        .inc();
    tracing::info!(subscribers = delivered, "verified transaction update relayed");

    HttpResponse::Ok().json(serde_json::json!({
        "message": "Transaction update received"
    }))
}

#[get("/transaction-status")]
pub async fn transaction_status(state: web::Data<AppState>) -> HttpResponse {
    match state.store.read() {
        Some(record) => HttpResponse::Ok().json(record),
        None => HttpResponse::NotFound().json(serde_json::json!({
            "message": "No transaction update available"
        })),
    }
}

#[post("/start-transaction")]
pub async fn start_transaction(state: web::Data<AppState>) -> HttpResponse {
    // Subscribers are not notified of a reset; pollers observe the empty
    // state on their next query.
    state.store.reset();
    tracing::info!("transaction slot reset, awaiting new payment");
    HttpResponse::Ok().json(serde_json::json!({
        "message": "Transaction reset. Awaiting new payment."
    }))
}

/// Format one SSE frame: the payload tagged with the event name.
fn sse_frame(event: &Event) -> String {
    format!(
        "event: {}\ndata: {}\n\n",
        event.event,
        serde_json::to_string(&event.data).unwrap_or_default()
    )
}

/// Unsubscribes when the client goes away and the response stream drops.
struct Subscription {
    hub: Arc<BroadcastHub>,
    id: Uuid,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.unsubscribe(&self.id);
        metrics::SSE_SUBSCRIBERS.dec();
    }
}

#[get("/events")]
pub async fn events(state: web::Data<AppState>) -> HttpResponse {
    let (id, rx) = state.hub.subscribe();
    metrics::SSE_SUBSCRIBERS.inc();
    let subscription = Subscription {
        hub: Arc::clone(&state.hub),
        id,
    };

    // Late joiners start from the current state instead of waiting for
    // the next webhook.
    let initial = state.store.read().map(|record| {
        Event::new(
            "transaction_update",
            serde_json::to_value(&record).unwrap_or_default(),
        )
    });

    let stream = futures::stream::iter(initial)
        .chain(tokio_stream::wrappers::ReceiverStream::new(rx))
        .map(move |event| {
            let _keep_alive = &subscription;
            Ok::<_, actix_web::Error>(web::Bytes::from(sse_frame(&event)))
        });

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .insert_header(("X-Accel-Buffering", "no"))
        .streaming(stream)
}

#[get("/health")]
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "paysync-relay",
        "subscribers": state.hub.subscriber_count(),
    }))
}

#[get("/metrics")]
pub async fn metrics_endpoint(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    // Metrics auth uses its own bearer token, never the webhook secret.
    match &state.metrics_token {
        Some(token) => {
            let authorized = req
                .headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(|t| paysync::security::constant_time_eq(t.as_bytes(), token))
                .unwrap_or(false);

            if !authorized {
                return HttpResponse::Unauthorized().json(serde_json::json!({
                    "error": "unauthorized",
                    "message": "Valid Bearer token required for /metrics"
                }));
            }
        }
        None => {
            // No token configured — metrics stay protected unless the
            // operator explicitly opts in to unauthenticated access.
            let public_metrics = std::env::var("PAYSYNC_PUBLIC_METRICS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false);
            if !public_metrics {
                return HttpResponse::Forbidden().json(serde_json::json!({
                    "error": "forbidden",
                    "message": "Set METRICS_TOKEN or PAYSYNC_PUBLIC_METRICS=true to access /metrics"
                }));
            }
        }
    }
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(metrics::metrics_output())
}
