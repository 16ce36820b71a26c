use crate::commerce::CartsModule;
use crate::domain::pending_result::PaymentErrorRecord;
use anyhow::Result;
use sqlx::PgPool;

#[derive(Clone)]
pub struct CartsRepo {
    pub pool: PgPool,
}

#[async_trait::async_trait]
impl CartsModule for CartsRepo {
    /// Writes the rejection under the cart's `payment_error` metadata key. The
    /// cart entity owns that field; this is the single writer per webhook.
    async fn record_payment_error(&self, cart_id: &str, record: &PaymentErrorRecord) -> Result<()> {
        let payload = serde_json::to_value(record)?;
        sqlx::query(
            r#"
            UPDATE carts
            SET metadata = jsonb_set(COALESCE(metadata, '{}'::jsonb), '{payment_error}', $2, true)
            WHERE id = $1
            "#,
        )
        .bind(cart_id)
        .bind(payload)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
