use crate::buffer::BufferBackend;
use crate::domain::pending_result::PendingPaymentResult;
use anyhow::Result;
use redis::AsyncCommands;

const CONNECT_ATTEMPTS: u32 = 3;

#[derive(Clone)]
pub struct RedisBufferStore {
    pub client: redis::Client,
}

impl RedisBufferStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    fn key(cart_id: &str) -> String {
        format!("pending_payment:{}", cart_id)
    }

    async fn conn(&self) -> Result<redis::aio::MultiplexedConnection> {
        let mut last_err = None;
        for attempt in 0..CONNECT_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(100 << attempt)).await;
            }
            match self.client.get_multiplexed_async_connection().await {
                Ok(conn) => return Ok(conn),
                Err(e) => last_err = Some(e),
            }
        }
        Err(anyhow::anyhow!(
            "redis connection failed after {} attempts: {}",
            CONNECT_ATTEMPTS,
            last_err.map(|e| e.to_string()).unwrap_or_default()
        ))
    }
}

#[async_trait::async_trait]
impl BufferBackend for RedisBufferStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn save(&self, result: &PendingPaymentResult) -> Result<()> {
        let mut conn = self.conn().await?;
        let payload = serde_json::to_string(result)?;
        let ttl = (result.expires_at - chrono::Utc::now()).num_seconds().max(1) as u64;
        let _: () = conn.set_ex(Self::key(&result.cart_id), payload, ttl).await?;
        Ok(())
    }

    async fn get(&self, cart_id: &str) -> Result<Option<PendingPaymentResult>> {
        let mut conn = self.conn().await?;
        let payload: Option<String> = conn.get(Self::key(cart_id)).await?;
        match payload {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(result) => Ok(Some(result)),
                Err(e) => {
                    tracing::warn!(cart_id, "discarding undecodable buffered result: {}", e);
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    async fn clear(&self, cart_id: &str) -> Result<()> {
        let mut conn = self.conn().await?;
        let _: usize = conn.del(Self::key(cart_id)).await?;
        Ok(())
    }
}
