use crate::domain::pending_result::PaymentErrorRecord;
use anyhow::Result;
use chrono::{DateTime, Utc};

pub mod notifier_redis;
pub mod payments_api;

/// A payment inside a collection, as seen at the platform boundary. Capture and
/// cancel are idempotent on the platform side; this service only has to pick a
/// payment by the same deterministic predicate every time.
#[derive(Debug, Clone)]
pub struct PaymentView {
    pub id: String,
    pub amount_minor: i64,
    pub captured_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
}

impl PaymentView {
    pub fn capturable(&self) -> bool {
        self.captured_at.is_none() && self.canceled_at.is_none()
    }

    /// Void flows may target an already-captured payment.
    pub fn voidable(&self) -> bool {
        self.canceled_at.is_none()
    }
}

#[async_trait::async_trait]
pub trait OrdersModule: Send + Sync {
    async fn find_order_id(&self, cart_id: &str) -> Result<Option<String>>;
    async fn find_cart_id(&self, order_id: &str) -> Result<Option<String>>;
    /// Merges `entry` into the order's metadata map.
    async fn annotate(&self, order_id: &str, entry: serde_json::Value) -> Result<()>;
}

#[async_trait::async_trait]
pub trait CartsModule: Send + Sync {
    async fn record_payment_error(&self, cart_id: &str, record: &PaymentErrorRecord) -> Result<()>;
}

#[async_trait::async_trait]
pub trait PaymentsModule: Send + Sync {
    async fn find_collection_by_order(&self, order_id: &str) -> Result<Option<String>>;
    async fn list_payments(&self, collection_id: &str) -> Result<Vec<PaymentView>>;
    async fn capture(&self, payment_id: &str) -> Result<()>;
    async fn cancel(&self, payment_id: &str) -> Result<()>;
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn order_placed(&self, order_id: &str) -> Result<()>;
    async fn payment_captured(&self, order_id: &str, provider: &str, transaction_id: &str) -> Result<()>;
    async fn payment_failed(&self, order_id: &str, provider: &str, reason: &str) -> Result<()>;
}
