use crate::buffer::BufferBackend;
use crate::domain::pending_result::{BufferedStatus, PendingPaymentResult};
use anyhow::Result;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Relational fallback. The table is created lazily on first use; `clear`
/// stamps `processed_at` instead of deleting so processed results remain
/// auditable.
#[derive(Clone)]
pub struct PgBufferStore {
    pub pool: PgPool,
    schema_ready: Arc<OnceCell<()>>,
}

impl PgBufferStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            schema_ready: Arc::new(OnceCell::new()),
        }
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.schema_ready
            .get_or_try_init(|| async {
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS pending_payment_results (
                        cart_id text PRIMARY KEY,
                        status text NOT NULL,
                        transaction_id text NOT NULL,
                        provider text NOT NULL,
                        amount_minor bigint NOT NULL,
                        currency text NOT NULL,
                        metadata jsonb NOT NULL DEFAULT '{}'::jsonb,
                        webhook_received_at timestamptz NOT NULL,
                        created_at timestamptz NOT NULL DEFAULT now(),
                        processed_at timestamptz,
                        expires_at timestamptz NOT NULL
                    )
                    "#,
                )
                .execute(&self.pool)
                .await?;

                sqlx::query(
                    "CREATE INDEX IF NOT EXISTS idx_pending_payment_results_cart_id ON pending_payment_results (cart_id)",
                )
                .execute(&self.pool)
                .await?;

                sqlx::query(
                    "CREATE INDEX IF NOT EXISTS idx_pending_payment_results_expires_at ON pending_payment_results (expires_at)",
                )
                .execute(&self.pool)
                .await?;

                Ok::<(), anyhow::Error>(())
            })
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl BufferBackend for PgBufferStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn save(&self, result: &PendingPaymentResult) -> Result<()> {
        self.ensure_schema().await?;
        sqlx::query(
            r#"
            INSERT INTO pending_payment_results (
                cart_id, status, transaction_id, provider, amount_minor,
                currency, metadata, webhook_received_at, expires_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (cart_id) DO UPDATE SET
                status = EXCLUDED.status,
                transaction_id = EXCLUDED.transaction_id,
                provider = EXCLUDED.provider,
                amount_minor = EXCLUDED.amount_minor,
                currency = EXCLUDED.currency,
                metadata = EXCLUDED.metadata,
                webhook_received_at = EXCLUDED.webhook_received_at,
                expires_at = EXCLUDED.expires_at,
                processed_at = NULL
            "#,
        )
        .bind(&result.cart_id)
        .bind(result.status.as_str())
        .bind(&result.transaction_id)
        .bind(&result.provider)
        .bind(result.amount_minor)
        .bind(&result.currency)
        .bind(&result.metadata)
        .bind(result.webhook_received_at)
        .bind(result.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, cart_id: &str) -> Result<Option<PendingPaymentResult>> {
        self.ensure_schema().await?;
        let row = sqlx::query(
            r#"
            SELECT cart_id, status, transaction_id, provider, amount_minor,
                   currency, metadata, webhook_received_at, expires_at
            FROM pending_payment_results
            WHERE cart_id = $1 AND processed_at IS NULL AND expires_at > now()
            "#,
        )
        .bind(cart_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| PendingPaymentResult {
            cart_id: r.get("cart_id"),
            status: BufferedStatus::parse(r.get("status")),
            transaction_id: r.get("transaction_id"),
            provider: r.get("provider"),
            amount_minor: r.get("amount_minor"),
            currency: r.get("currency"),
            metadata: r.get("metadata"),
            webhook_received_at: r.get("webhook_received_at"),
            expires_at: r.get("expires_at"),
        }))
    }

    async fn clear(&self, cart_id: &str) -> Result<()> {
        self.ensure_schema().await?;
        sqlx::query(
            "UPDATE pending_payment_results SET processed_at = now() WHERE cart_id = $1 AND processed_at IS NULL",
        )
        .bind(cart_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
