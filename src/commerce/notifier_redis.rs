use crate::commerce::Notifier;
use anyhow::Result;
use uuid::Uuid;

/// Publishes customer-notification events onto the platform's event stream.
/// Every send here is best-effort at the call sites.
#[derive(Clone)]
pub struct RedisNotifier {
    pub client: redis::Client,
    pub stream_key: String,
}

impl RedisNotifier {
    async fn publish(&self, event: serde_json::Value) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(&event)?;
        let _: String = redis::cmd("XADD")
            .arg(&self.stream_key)
            .arg("MAXLEN")
            .arg("~")
            .arg(1_000_000)
            .arg("*")
            .arg("event")
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Notifier for RedisNotifier {
    async fn order_placed(&self, order_id: &str) -> Result<()> {
        self.publish(serde_json::json!({
            "id": Uuid::new_v4(),
            "type": "order.placed",
            "order_id": order_id,
            "at": chrono::Utc::now(),
        }))
        .await
    }

    async fn payment_captured(&self, order_id: &str, provider: &str, transaction_id: &str) -> Result<()> {
        self.publish(serde_json::json!({
            "id": Uuid::new_v4(),
            "type": "payment.captured",
            "order_id": order_id,
            "provider": provider,
            "transaction_id": transaction_id,
            "at": chrono::Utc::now(),
        }))
        .await
    }

    async fn payment_failed(&self, order_id: &str, provider: &str, reason: &str) -> Result<()> {
        self.publish(serde_json::json!({
            "id": Uuid::new_v4(),
            "type": "payment.failed",
            "order_id": order_id,
            "provider": provider,
            "reason": reason,
            "at": chrono::Utc::now(),
        }))
        .await
    }
}
