use crate::buffer::ResultBufferStore;
use crate::commerce::{CartsModule, Notifier, OrdersModule, PaymentsModule};
use crate::domain::outcome::{NormalizedWebhook, ProviderOutcome};
use crate::domain::pending_result::{PaymentErrorRecord, PendingPaymentResult};
use axum::http::StatusCode;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

/// Reply committed to the provider. Once built, everything after it is
/// best-effort; a webhook response is never taken back.
#[derive(Debug)]
pub struct WebhookReply {
    pub status: StatusCode,
    pub body: serde_json::Value,
}

impl WebhookReply {
    pub fn ok(message: &str, cart_id: &str) -> Self {
        Self {
            status: StatusCode::OK,
            body: json!({ "message": message, "cart_id": cart_id }),
        }
    }

    pub fn pending(cart_id: &str) -> Self {
        // 402 tells the caller to re-send once the provider state resolves.
        Self {
            status: StatusCode::PAYMENT_REQUIRED,
            body: json!({ "message": "payment pending", "cart_id": cart_id }),
        }
    }
}

/// Logs and drops a best-effort failure so the webhook acknowledgment stands.
pub fn report_if_err<T>(action: &str, result: anyhow::Result<T>) {
    if let Err(e) = result {
        tracing::error!("{} failed: {e:#}", action);
    }
}

/// Webhook-side half of the reconciliation state machine: verify (done by the
/// adapter), resolve linkage, then either settle against the existing order or
/// hold the result until order creation.
#[derive(Clone)]
pub struct ReconciliationService {
    pub orders: Arc<dyn OrdersModule>,
    pub carts: Arc<dyn CartsModule>,
    pub payments: Arc<dyn PaymentsModule>,
    pub notifier: Arc<dyn Notifier>,
    pub buffer: ResultBufferStore,
}

impl ReconciliationService {
    pub async fn handle_webhook(&self, webhook: NormalizedWebhook) -> WebhookReply {
        // Pending short-circuits before any order lookup; the provider re-sends
        // once the transaction resolves.
        if webhook.outcome == ProviderOutcome::Pending {
            return WebhookReply::pending(&webhook.cart_id);
        }
        match self.known_order(&webhook.cart_id).await {
            Some(order_id) => self.settle_with_order(webhook, &order_id).await,
            None => self.hold_for_order(webhook).await,
        }
    }

    /// A linkage lookup error is treated as "no order yet": buffering a result
    /// we might not have needed beats dropping one we did.
    pub async fn known_order(&self, cart_id: &str) -> Option<String> {
        match self.orders.find_order_id(cart_id).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(cart_id, "order linkage lookup failed, treating as no order: {e:#}");
                None
            }
        }
    }

    async fn hold_for_order(&self, webhook: NormalizedWebhook) -> WebhookReply {
        match &webhook.outcome {
            ProviderOutcome::Approved => {
                let result = PendingPaymentResult::from_webhook(&webhook, Utc::now());
                if let Err(e) = self.buffer.save(&result).await {
                    tracing::error!(cart_id = %webhook.cart_id, "buffering payment result failed: {e:#}");
                    return WebhookReply {
                        status: StatusCode::INTERNAL_SERVER_ERROR,
                        body: json!({ "message": "failed to persist payment result" }),
                    };
                }
                WebhookReply::ok("saved, waiting for order creation", &webhook.cart_id)
            }
            ProviderOutcome::Pending => WebhookReply::pending(&webhook.cart_id),
            ProviderOutcome::Rejected { .. } | ProviderOutcome::Unknown { .. } => {
                if let ProviderOutcome::Unknown { raw } = &webhook.outcome {
                    tracing::warn!(
                        provider = webhook.provider,
                        cart_id = %webhook.cart_id,
                        "unrecognized provider status '{}', recording as failure",
                        raw
                    );
                }
                let record = PaymentErrorRecord {
                    status: webhook.raw_status.clone(),
                    provider: webhook.provider.to_string(),
                    message: webhook.status_message(),
                    transaction_id: webhook.transaction_id.clone(),
                    timestamp: Utc::now(),
                };
                report_if_err(
                    "recording payment error on cart",
                    self.carts.record_payment_error(&webhook.cart_id, &record).await,
                );
                WebhookReply::ok("error saved to cart", &webhook.cart_id)
            }
        }
    }

    pub async fn settle_with_order(&self, webhook: NormalizedWebhook, order_id: &str) -> WebhookReply {
        if webhook.outcome == ProviderOutcome::Pending {
            tracing::warn!(order_id, cart_id = %webhook.cart_id, "pending status for an already-created order");
            return WebhookReply::pending(&webhook.cart_id);
        }

        let collection_id = match self.payments.find_collection_by_order(order_id).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                // Data-consistency gap the provider cannot fix; do not make it retry.
                tracing::warn!(order_id, "no payment collection for order");
                self.annotate_order(order_id, &webhook).await;
                return WebhookReply::ok("no payment collection for order", &webhook.cart_id);
            }
            Err(e) => {
                tracing::error!(order_id, "payment collection lookup failed: {e:#}");
                return WebhookReply::ok("payment collection lookup failed", &webhook.cart_id);
            }
        };

        let payments = match self.payments.list_payments(&collection_id).await {
            Ok(payments) => payments,
            Err(e) => {
                tracing::error!(order_id, collection_id = %collection_id, "listing payments failed: {e:#}");
                self.annotate_order(order_id, &webhook).await;
                return WebhookReply::ok("payment lookup failed", &webhook.cart_id);
            }
        };

        match &webhook.outcome {
            ProviderOutcome::Approved => {
                let message = match payments.iter().find(|p| p.capturable()) {
                    Some(payment) => {
                        report_if_err("capturing payment", self.payments.capture(&payment.id).await);
                        report_if_err(
                            "payment captured notification",
                            self.notifier
                                .payment_captured(order_id, webhook.provider, &webhook.transaction_id)
                                .await,
                        );
                        "payment captured"
                    }
                    None => {
                        tracing::warn!(order_id, "no capturable payment in collection");
                        "no capturable payment"
                    }
                };
                self.annotate_order(order_id, &webhook).await;
                WebhookReply::ok(message, &webhook.cart_id)
            }
            ProviderOutcome::Rejected { .. } | ProviderOutcome::Unknown { .. } => {
                if let Some(payment) = payments.iter().find(|p| p.voidable()) {
                    report_if_err("canceling payment", self.payments.cancel(&payment.id).await);
                } else {
                    tracing::warn!(order_id, "no voidable payment in collection");
                }
                // Order metadata reflects the provider status whether or not
                // the cancel call went through.
                self.annotate_order(order_id, &webhook).await;
                report_if_err(
                    "payment failed notification",
                    self.notifier
                        .payment_failed(order_id, webhook.provider, &webhook.raw_status)
                        .await,
                );
                WebhookReply::ok("payment cancelled", &webhook.cart_id)
            }
            ProviderOutcome::Pending => WebhookReply::pending(&webhook.cart_id),
        }
    }

    async fn annotate_order(&self, order_id: &str, webhook: &NormalizedWebhook) {
        let entry = json!({
            "payment_webhook": {
                "provider": webhook.provider,
                "provider_status": webhook.raw_status,
                "transaction_id": webhook.transaction_id,
                "received_at": Utc::now(),
                "message": webhook.status_message(),
            }
        });
        report_if_err("order metadata update", self.orders.annotate(order_id, entry).await);
    }
}
