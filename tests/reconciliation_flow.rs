mod common;

use axum::http::StatusCode;
use common::{authorized_payment, captured_payment, webhook, World};
use payment_reconciler::domain::outcome::ProviderOutcome;
use payment_reconciler::domain::pending_result::BufferedStatus;
use std::sync::atomic::Ordering;

fn approved() -> ProviderOutcome {
    ProviderOutcome::Approved
}

fn rejected(reason: &str) -> ProviderOutcome {
    ProviderOutcome::Rejected {
        reason: reason.to_string(),
    }
}

#[tokio::test]
async fn approved_webhook_without_order_is_buffered_not_captured() {
    let world = World::new();
    let reply = world
        .service()
        .handle_webhook(webhook("cart_A", "tx1", approved()))
        .await;

    assert_eq!(reply.status, StatusCode::OK);
    let buffered = world.buffer.get("cart_A").await.unwrap();
    assert_eq!(buffered.status, BufferedStatus::Approved);
    assert_eq!(buffered.transaction_id, "tx1");
    assert!(world.capture_calls().is_empty());
}

#[tokio::test]
async fn rejected_webhook_without_order_writes_cart_error_not_buffer() {
    let world = World::new();
    let reply = world
        .service()
        .handle_webhook(webhook("cart_A", "tx1", rejected("REJECTED")))
        .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert!(world.buffer.get("cart_A").await.is_none());

    let errors = world.carts.errors.lock().unwrap();
    let record = errors.get("cart_A").expect("payment_error recorded on cart");
    assert_eq!(record.transaction_id, "tx1");
    assert_eq!(record.status, "REJECTED");
    assert_eq!(record.provider, "payvalida");
}

#[tokio::test]
async fn pending_webhook_returns_402_and_writes_nothing() {
    let world = World::new();
    let reply = world
        .service()
        .handle_webhook(webhook("cart_A", "tx1", ProviderOutcome::Pending))
        .await;

    assert_eq!(reply.status, StatusCode::PAYMENT_REQUIRED);
    assert!(world.buffer.get("cart_A").await.is_none());
    assert!(world.carts.errors.lock().unwrap().is_empty());
}

#[tokio::test]
async fn approved_webhook_with_order_captures_immediately() {
    let world = World::new();
    world.link("cart_A", "order_1");
    world.add_collection("order_1", "paycol_1", vec![authorized_payment("pay_1", 50000)]);

    let reply = world
        .service()
        .handle_webhook(webhook("cart_A", "tx1", approved()))
        .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(world.capture_calls(), vec!["pay_1".to_string()]);
    assert!(world.buffer.get("cart_A").await.is_none());
    assert!(world
        .notifications()
        .iter()
        .any(|n| n.starts_with("payment.captured:order_1")));
    assert!(!world.orders.annotations.lock().unwrap().is_empty());
}

#[tokio::test]
async fn rejected_webhook_with_order_cancels_and_annotates() {
    let world = World::new();
    world.link("cart_A", "order_1");
    world.add_collection("order_1", "paycol_1", vec![authorized_payment("pay_1", 50000)]);

    let reply = world
        .service()
        .handle_webhook(webhook("cart_A", "tx1", rejected("VOID_REJECTED")))
        .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(world.cancel_calls(), vec!["pay_1".to_string()]);
    assert!(world.capture_calls().is_empty());

    let annotations = world.orders.annotations.lock().unwrap();
    let (order_id, entry) = annotations.first().expect("order metadata written");
    assert_eq!(order_id, "order_1");
    assert_eq!(entry["payment_webhook"]["provider_status"], "VOID_REJECTED");
}

#[tokio::test]
async fn approved_without_capturable_payment_acks_with_neutral_message() {
    let world = World::new();
    world.link("cart_A", "order_1");
    world.add_collection("order_1", "paycol_1", vec![captured_payment("pay_1", 50000)]);

    let reply = world
        .service()
        .handle_webhook(webhook("cart_A", "tx1", approved()))
        .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["message"], "no capturable payment");
    assert!(world.capture_calls().is_empty());
}

#[tokio::test]
async fn void_flow_targets_already_captured_payment() {
    let world = World::new();
    world.link("cart_A", "order_1");
    world.add_collection("order_1", "paycol_1", vec![captured_payment("pay_1", 50000)]);

    world
        .service()
        .handle_webhook(webhook("cart_A", "tx1", rejected("VOID_REJECTED")))
        .await;

    assert_eq!(world.cancel_calls(), vec!["pay_1".to_string()]);
}

#[tokio::test]
async fn missing_collection_is_acknowledged_not_failed() {
    let world = World::new();
    world.link("cart_A", "order_1");

    let reply = world
        .service()
        .handle_webhook(webhook("cart_A", "tx1", approved()))
        .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert!(world.capture_calls().is_empty());
    assert!(world.buffer.get("cart_A").await.is_none());
}

#[tokio::test]
async fn capture_failure_still_acknowledges_webhook() {
    let world = World::new();
    world.link("cart_A", "order_1");
    world.add_collection("order_1", "paycol_1", vec![authorized_payment("pay_1", 50000)]);
    world.payments.fail_capture.store(true, Ordering::SeqCst);

    let reply = world
        .service()
        .handle_webhook(webhook("cart_A", "tx1", approved()))
        .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(world.capture_calls().len(), 1);
}

#[tokio::test]
async fn linkage_lookup_error_buffers_instead_of_dropping() {
    let world = World::new();
    world.link("cart_A", "order_1");
    world.orders.fail_lookups.store(true, Ordering::SeqCst);

    let reply = world
        .service()
        .handle_webhook(webhook("cart_A", "tx1", approved()))
        .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert!(world.buffer.get("cart_A").await.is_some());
    assert!(world.capture_calls().is_empty());
}

#[tokio::test]
async fn order_created_consumes_buffered_result() {
    let world = World::new();
    world.link("cart_A", "order_1");
    world.add_collection("order_1", "paycol_1", vec![authorized_payment("pay_1", 50000)]);
    world
        .buffer
        .save(&payment_reconciler::domain::pending_result::PendingPaymentResult::from_webhook(
            &webhook("cart_A", "tx1", approved()),
            chrono::Utc::now(),
        ))
        .await
        .unwrap();

    world.consumer().handle_order_created("order_1").await.unwrap();

    assert_eq!(world.capture_calls(), vec!["pay_1".to_string()]);
    assert!(world.buffer.get("cart_A").await.is_none());
    let notifications = world.notifications();
    assert!(notifications.iter().any(|n| n == "order.placed:order_1"));
    assert!(notifications
        .iter()
        .any(|n| n.starts_with("payment.captured:order_1")));
}

#[tokio::test]
async fn order_created_without_buffered_result_only_notifies() {
    let world = World::new();
    world.link("cart_A", "order_1");

    world.consumer().handle_order_created("order_1").await.unwrap();

    assert!(world.capture_calls().is_empty());
    assert_eq!(world.notifications(), vec!["order.placed:order_1".to_string()]);
}

#[tokio::test]
async fn order_created_clears_stale_non_approved_entry() {
    let world = World::new();
    world.link("cart_A", "order_1");
    world
        .buffer
        .save(&payment_reconciler::domain::pending_result::PendingPaymentResult::from_webhook(
            &webhook("cart_A", "tx1", rejected("REJECTED")),
            chrono::Utc::now(),
        ))
        .await
        .unwrap();

    world.consumer().handle_order_created("order_1").await.unwrap();

    assert!(world.capture_calls().is_empty());
    assert!(world.buffer.get("cart_A").await.is_none());
}

#[tokio::test]
async fn consumer_clears_buffer_even_when_capture_fails() {
    let world = World::new();
    world.link("cart_A", "order_1");
    world.add_collection("order_1", "paycol_1", vec![authorized_payment("pay_1", 50000)]);
    world.payments.fail_capture.store(true, Ordering::SeqCst);
    world
        .buffer
        .save(&payment_reconciler::domain::pending_result::PendingPaymentResult::from_webhook(
            &webhook("cart_A", "tx1", approved()),
            chrono::Utc::now(),
        ))
        .await
        .unwrap();

    world.consumer().handle_order_created("order_1").await.unwrap();

    assert!(world.buffer.get("cart_A").await.is_none());
}

#[tokio::test]
async fn second_webhook_after_capture_finds_nothing_capturable() {
    let world = World::new();
    world.link("cart_A", "order_1");
    world.add_collection("order_1", "paycol_1", vec![authorized_payment("pay_1", 50000)]);

    let service = world.service();
    service.handle_webhook(webhook("cart_A", "tx1", approved())).await;
    let reply = service.handle_webhook(webhook("cart_A", "tx2", approved())).await;

    // The payment module boundary is idempotent; the second webhook sees no
    // capturable payment and acks without a second capture.
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(world.capture_calls(), vec!["pay_1".to_string()]);
}

#[tokio::test]
async fn end_to_end_webhook_then_order_created() {
    let world = World::new();
    let service = world.service();

    // Webhook first, no order yet.
    let reply = service
        .handle_webhook(webhook("cart_TEST1", "tx123", approved()))
        .await;
    assert_eq!(reply.status, StatusCode::OK);

    let buffered = world.buffer.get("cart_TEST1").await.unwrap();
    assert_eq!(buffered.status, BufferedStatus::Approved);
    assert_eq!(buffered.amount_minor, 50000);
    assert_eq!(buffered.currency, "COP");
    assert_eq!(buffered.transaction_id, "tx123");

    // Order arrives second and picks the result up.
    world.link("cart_TEST1", "order_42");
    world.add_collection("order_42", "paycol_42", vec![authorized_payment("pay_42", 50000)]);
    world.consumer().handle_order_created("order_42").await.unwrap();

    assert_eq!(world.capture_calls(), vec!["pay_42".to_string()]);
    assert!(world.buffer.get("cart_TEST1").await.is_none());
}
