mod common;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use common::{authorized_payment, webhook, World, WOMPI_SECRET};
use payment_reconciler::domain::outcome::ProviderOutcome;
use payment_reconciler::domain::pending_result::PendingPaymentResult;
use payment_reconciler::http::handlers::payment_status::get_payment_status;
use payment_reconciler::http::handlers::webhooks::wompi_webhook;
use payment_reconciler::providers::event_checksum;
use std::time::Duration;

fn wompi_body(status: &str, checksum: &str) -> Bytes {
    Bytes::from(
        serde_json::json!({
            "event": "transaction.updated",
            "timestamp": 1700000000,
            "signature": { "checksum": checksum },
            "data": {
                "transaction": {
                    "id": "tx-w1",
                    "status": status,
                    "amount_in_cents": 50000,
                    "reference": "cart_A",
                    "currency": "COP",
                }
            }
        })
        .to_string(),
    )
}

fn valid_checksum(status: &str) -> String {
    event_checksum(&["tx-w1", status, "50000", "1700000000"], WOMPI_SECRET)
}

#[tokio::test]
async fn wompi_acks_200_before_verification_when_order_exists() {
    let world = World::new();
    world.link("cart_A", "order_1");
    world.add_collection("order_1", "paycol_1", vec![authorized_payment("pay_1", 50000)]);

    let response = wompi_webhook(
        State(world.app_state()),
        HeaderMap::new(),
        wompi_body("APPROVED", "DEADBEEF"),
    )
    .await;

    // 200 despite the bad checksum; the failed verification on the spawned
    // task only logs and must leave no settle side effects behind.
    assert_eq!(response.status(), StatusCode::OK);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(world.capture_calls().is_empty());
    assert!(world.orders.annotations.lock().unwrap().is_empty());
    assert!(world.notifications().is_empty());
}

#[tokio::test]
async fn wompi_early_ack_settles_once_verification_passes() {
    let world = World::new();
    world.link("cart_A", "order_1");
    world.add_collection("order_1", "paycol_1", vec![authorized_payment("pay_1", 50000)]);

    let response = wompi_webhook(
        State(world.app_state()),
        HeaderMap::new(),
        wompi_body("APPROVED", &valid_checksum("APPROVED")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    for _ in 0..100 {
        if !world.capture_calls().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(world.capture_calls(), vec!["pay_1".to_string()]);
}

#[tokio::test]
async fn wompi_without_order_rejects_bad_checksum_with_401() {
    let world = World::new();

    let response = wompi_webhook(
        State(world.app_state()),
        HeaderMap::new(),
        wompi_body("APPROVED", "DEADBEEF"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(world.buffer.get("cart_A").await.is_none());
}

#[tokio::test]
async fn wompi_without_order_buffers_after_verification() {
    let world = World::new();

    let response = wompi_webhook(
        State(world.app_state()),
        HeaderMap::new(),
        wompi_body("APPROVED", &valid_checksum("APPROVED")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let buffered = world.buffer.get("cart_A").await.unwrap();
    assert_eq!(buffered.transaction_id, "tx-w1");
}

#[tokio::test]
async fn payment_status_returns_404_when_nothing_buffered() {
    let world = World::new();

    let response = get_payment_status(State(world.app_state()), Path("cart_A".to_string()))
        .await
        .into_response();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn payment_status_projects_redacted_fields_only() {
    let world = World::new();
    world
        .buffer
        .save(&PendingPaymentResult::from_webhook(
            &webhook("cart_A", "tx1", ProviderOutcome::Approved),
            chrono::Utc::now(),
        ))
        .await
        .unwrap();

    let response = get_payment_status(State(world.app_state()), Path("cart_A".to_string()))
        .await
        .into_response();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let fields = body.as_object().unwrap();

    for field in [
        "status",
        "transaction_id",
        "provider",
        "amount",
        "currency",
        "webhook_received_at",
    ] {
        assert!(fields.contains_key(field), "missing field '{}'", field);
    }
    assert_eq!(fields.len(), 6);
    assert!(!fields.contains_key("metadata"));
    assert_eq!(body["transaction_id"], "tx1");
    assert_eq!(body["amount"], 50000);
    assert_eq!(body["status"], "approved");
}
