use actix_web::{test, web, App};
use std::sync::Arc;

use paysync::{signature, BroadcastHub, TransactionStore};
use paysync_relay::routes;
use paysync_relay::state::AppState;

fn make_state(secret: &[u8]) -> web::Data<AppState> {
    web::Data::new(AppState {
        store: TransactionStore::new(),
        hub: Arc::new(BroadcastHub::new()),
        webhook_secret: secret.to_vec(),
        metrics_token: None,
    })
}

fn make_state_with_metrics_token(secret: &[u8], metrics_token: Vec<u8>) -> web::Data<AppState> {
    web::Data::new(AppState {
        store: TransactionStore::new(),
        hub: Arc::new(BroadcastHub::new()),
        webhook_secret: secret.to_vec(),
        metrics_token: Some(metrics_token),
    })
}

/// Signature header value the provider would send for `body`.
fn sign(secret: &[u8], timestamp: &str, body: &[u8]) -> String {
    let sig = signature::compute_signature(secret, timestamp, body);
    format!("timestamp={timestamp},signature={sig}")
}

#[actix_rt::test]
async fn test_status_is_404_before_any_transaction() {
    let state = make_state(b"test-secret");
    let app =
        test::init_service(App::new().app_data(state).service(routes::transaction_status)).await;

    let req = test::TestRequest::get()
        .uri("/transaction-status")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 404);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "No transaction update available");
}

#[actix_rt::test]
async fn test_start_transaction_then_status_is_404() {
    let state = make_state(b"test-secret");
    let app = test::init_service(
        App::new()
            .app_data(state)
            .service(routes::start_transaction)
            .service(routes::transaction_status),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/start-transaction")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Transaction reset. Awaiting new payment.");

    let req = test::TestRequest::get()
        .uri("/transaction-status")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

#[actix_rt::test]
async fn test_valid_webhook_updates_status_and_notifies_subscribers() {
    let secret = b"test-secret";
    let state = make_state(secret);
    let (_id, mut rx) = state.hub.subscribe();

    let app = test::init_service(
        App::new()
            .app_data(state)
            .service(routes::transaction_callback)
            .service(routes::transaction_status),
    )
    .await;

    let body = br#"{"amount":100,"status":"SUCCESS"}"#;
    let req = test::TestRequest::post()
        .uri("/transaction-callback")
        .set_payload(&body[..])
        .insert_header(("Content-Type", "application/json"))
        .insert_header((routes::SIGNATURE_HEADER, sign(secret, "1700000000", body)))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
    let ack: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(ack["message"], "Transaction update received");

    // Poll path sees the committed record plus the ingestion timestamp.
    let req = test::TestRequest::get()
        .uri("/transaction-status")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let record: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(record["amount"], 100);
    assert_eq!(record["status"], "SUCCESS");
    assert!(record["received_at"].is_string());

    // Push path got the same payload.
    let event = rx.try_recv().unwrap();
    assert_eq!(event.event, "transaction_update");
    assert_eq!(event.data["amount"], 100);
    assert_eq!(event.data["status"], "SUCCESS");
}

#[actix_rt::test]
async fn test_missing_signature_is_rejected_and_state_unchanged() {
    let state = make_state(b"test-secret");
    let app = test::init_service(
        App::new()
            .app_data(state)
            .service(routes::transaction_callback)
            .service(routes::transaction_status),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/transaction-callback")
        .set_payload(r#"{"amount":100}"#)
        .insert_header(("Content-Type", "application/json"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Missing signature");

    let req = test::TestRequest::get()
        .uri("/transaction-status")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

#[actix_rt::test]
async fn test_wrong_signature_is_rejected_and_state_unchanged() {
    let state = make_state(b"test-secret");
    let app = test::init_service(
        App::new()
            .app_data(state)
            .service(routes::transaction_callback)
            .service(routes::transaction_status),
    )
    .await;

    let body = br#"{"amount":100,"status":"SUCCESS"}"#;
    // Signed with a different secret — same shape, wrong MAC.
    let req = test::TestRequest::post()
        .uri("/transaction-callback")
        .set_payload(&body[..])
        .insert_header(("Content-Type", "application/json"))
        .insert_header((
            routes::SIGNATURE_HEADER,
            sign(b"other-secret", "1700000000", body),
        ))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 403);
    let resp_body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(resp_body["error"], "Invalid signature");

    let req = test::TestRequest::get()
        .uri("/transaction-status")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

#[actix_rt::test]
async fn test_malformed_signature_header_is_rejected() {
    let state = make_state(b"test-secret");
    let app = test::init_service(
        App::new()
            .app_data(state)
            .service(routes::transaction_callback),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/transaction-callback")
        .set_payload("{}")
        .insert_header(("Content-Type", "application/json"))
        .insert_header((routes::SIGNATURE_HEADER, "garbage"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Malformed signature header");
}

#[actix_rt::test]
async fn test_valid_signature_with_non_object_body_is_rejected() {
    let secret = b"test-secret";
    let state = make_state(secret);
    let app = test::init_service(
        App::new()
            .app_data(state)
            .service(routes::transaction_callback)
            .service(routes::transaction_status),
    )
    .await;

    // The signature is over the raw bytes, so it passes; the body still
    // has to be a JSON object to become a record.
    let body = b"not json at all";
    let req = test::TestRequest::post()
        .uri("/transaction-callback")
        .set_payload(&body[..])
        .insert_header(("Content-Type", "application/json"))
        .insert_header((routes::SIGNATURE_HEADER, sign(secret, "1700000000", body)))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 400);
    let resp_body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(resp_body["error"], "Invalid JSON body");

    let req = test::TestRequest::get()
        .uri("/transaction-status")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

#[actix_rt::test]
async fn test_rejected_webhook_broadcasts_error_event() {
    let state = make_state(b"test-secret");
    let (_id, mut rx) = state.hub.subscribe();

    let app = test::init_service(
        App::new()
            .app_data(state)
            .service(routes::transaction_callback),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/transaction-callback")
        .set_payload("{}")
        .insert_header(("Content-Type", "application/json"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let event = rx.try_recv().unwrap();
    assert_eq!(event.event, "error");
    assert_eq!(event.data, serde_json::json!("Missing signature"));
}

#[actix_rt::test]
async fn test_events_endpoint_streams_sse() {
    let state = make_state(b"test-secret");
    let app = test::init_service(App::new().app_data(state.clone()).service(routes::events)).await;

    let req = test::TestRequest::get().uri("/events").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "text/event-stream"
    );
    assert_eq!(state.hub.subscriber_count(), 1);
}

#[actix_rt::test]
async fn test_health_reports_subscriber_count() {
    let state = make_state(b"test-secret");
    let (_id, _rx) = state.hub.subscribe();
    let app = test::init_service(App::new().app_data(state).service(routes::health)).await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "paysync-relay");
    assert_eq!(body["subscribers"], 1);
}

#[actix_rt::test]
async fn test_metrics_requires_bearer_token() {
    let state = make_state_with_metrics_token(b"test-secret", b"metrics-token-123".to_vec());
    let app =
        test::init_service(App::new().app_data(state).service(routes::metrics_endpoint)).await;

    // No bearer token -> 401
    let req = test::TestRequest::get().uri("/metrics").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);

    // Wrong bearer token (the webhook secret, not the metrics token) -> 401
    let req = test::TestRequest::get()
        .uri("/metrics")
        .insert_header(("Authorization", "Bearer test-secret"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);

    // Correct metrics token -> 200
    let req = test::TestRequest::get()
        .uri("/metrics")
        .insert_header(("Authorization", "Bearer metrics-token-123"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
}

#[actix_rt::test]
async fn test_metrics_forbidden_when_no_token_configured() {
    // No token configured -> 403 unless PAYSYNC_PUBLIC_METRICS=true
    let state = make_state(b"test-secret");
    let app =
        test::init_service(App::new().app_data(state).service(routes::metrics_endpoint)).await;

    let req = test::TestRequest::get().uri("/metrics").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);
}
