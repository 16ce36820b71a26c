use crate::commerce::OrdersModule;
use anyhow::Result;
use sqlx::{PgPool, Row};

/// Read side of the platform's order↔cart linkage plus the order metadata
/// audit write. The linkage relation is owned by the order module; this repo
/// only queries it.
#[derive(Clone)]
pub struct OrderLinksRepo {
    pub pool: PgPool,
}

#[async_trait::async_trait]
impl OrdersModule for OrderLinksRepo {
    async fn find_order_id(&self, cart_id: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT order_id FROM cart_order_links WHERE cart_id = $1")
            .bind(cart_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("order_id")))
    }

    async fn find_cart_id(&self, order_id: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT cart_id FROM cart_order_links WHERE order_id = $1")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("cart_id")))
    }

    async fn annotate(&self, order_id: &str, entry: serde_json::Value) -> Result<()> {
        sqlx::query(
            "UPDATE orders SET metadata = COALESCE(metadata, '{}'::jsonb) || $2 WHERE id = $1",
        )
        .bind(order_id)
        .bind(entry)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
