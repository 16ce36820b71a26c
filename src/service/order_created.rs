use crate::buffer::ResultBufferStore;
use crate::commerce::{Notifier, OrdersModule, PaymentsModule};
use crate::domain::pending_result::{BufferedStatus, PendingPaymentResult};
use crate::service::reconciliation::report_if_err;
use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

/// Order-creation half of the reconciliation state machine: picks up whatever
/// the webhook left in the buffer and performs the deferred capture.
#[derive(Clone)]
pub struct OrderCreatedConsumer {
    pub orders: Arc<dyn OrdersModule>,
    pub payments: Arc<dyn PaymentsModule>,
    pub notifier: Arc<dyn Notifier>,
    pub buffer: ResultBufferStore,
}

impl OrderCreatedConsumer {
    pub async fn handle_order_created(&self, order_id: &str) -> Result<()> {
        // The order-placed notification is independent of any buffered payment.
        report_if_err("order placed notification", self.notifier.order_placed(order_id).await);

        let Some(cart_id) = self.orders.find_cart_id(order_id).await? else {
            return Ok(());
        };
        let Some(result) = self.buffer.get(&cart_id).await else {
            return Ok(());
        };

        if result.status != BufferedStatus::Approved {
            tracing::info!(cart_id = %cart_id, order_id, "clearing stale non-approved buffered result");
            self.buffer.clear(&cart_id).await;
            return Ok(());
        }

        if let Err(e) = self.capture_buffered(order_id, &result).await {
            tracing::error!(order_id, cart_id = %cart_id, "deferred capture failed: {e:#}");
        }
        // Cleared even on failure so a poisoned entry is not replayed until TTL.
        self.buffer.clear(&cart_id).await;
        Ok(())
    }

    async fn capture_buffered(&self, order_id: &str, result: &PendingPaymentResult) -> Result<()> {
        let collection_id = self
            .payments
            .find_collection_by_order(order_id)
            .await?
            .context("no payment collection for order")?;
        let payments = self.payments.list_payments(&collection_id).await?;
        let payment = payments
            .iter()
            .find(|p| p.capturable())
            .context("no capturable payment in collection")?;

        self.payments.capture(&payment.id).await?;

        report_if_err(
            "order metadata update",
            self.orders
                .annotate(
                    order_id,
                    json!({
                        "payment_webhook": {
                            "provider": result.provider,
                            "transaction_id": result.transaction_id,
                            "captured": true,
                            "captured_at": Utc::now(),
                        }
                    }),
                )
                .await,
        );
        report_if_err(
            "payment captured notification",
            self.notifier
                .payment_captured(order_id, &result.provider, &result.transaction_id)
                .await,
        );
        Ok(())
    }
}
