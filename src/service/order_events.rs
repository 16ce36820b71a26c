use crate::service::order_created::OrderCreatedConsumer;
use anyhow::Result;
use redis::streams::StreamReadReply;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct OrderCreatedEvent {
    pub order_id: String,
}

/// Consumes order-created lifecycle events from the platform's Redis stream
/// and drives the buffer consumer. Spawned from `main`.
#[derive(Clone)]
pub struct OrderEventListener {
    pub redis_client: redis::Client,
    pub stream_key: String,
    pub group: String,
    pub consumer_name: String,
    pub consumer: OrderCreatedConsumer,
}

impl OrderEventListener {
    pub async fn run(self) {
        loop {
            if let Err(e) = self.listen().await {
                tracing::error!("order event listener error: {e:#}");
            }
            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        }
    }

    async fn listen(&self) -> Result<()> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;

        // BUSYGROUP on re-create is fine.
        let _: redis::RedisResult<String> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.stream_key)
            .arg(&self.group)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        loop {
            let reply: StreamReadReply = match redis::cmd("XREADGROUP")
                .arg("GROUP")
                .arg(&self.group)
                .arg(&self.consumer_name)
                .arg("COUNT")
                .arg(64)
                .arg("BLOCK")
                .arg(2000)
                .arg("STREAMS")
                .arg(&self.stream_key)
                .arg(">")
                .query_async(&mut conn)
                .await
            {
                Ok(reply) => reply,
                Err(e) if e.is_io_error() || e.is_connection_dropped() => return Err(e.into()),
                // Nil reply when the block times out with nothing pending.
                Err(_) => StreamReadReply::default(),
            };

            for stream in reply.keys {
                for entry in stream.ids {
                    let raw = entry
                        .map
                        .get("event")
                        .and_then(|v| redis::from_redis_value::<String>(v).ok());

                    if let Some(raw_json) = raw {
                        match serde_json::from_str::<OrderCreatedEvent>(&raw_json) {
                            Ok(event) => {
                                if let Err(e) = self.consumer.handle_order_created(&event.order_id).await {
                                    tracing::error!(
                                        order_id = %event.order_id,
                                        "order created handling failed: {e:#}"
                                    );
                                }
                            }
                            Err(e) => tracing::warn!("skipping malformed order event: {}", e),
                        }
                    }

                    let _: i64 = redis::cmd("XACK")
                        .arg(&self.stream_key)
                        .arg(&self.group)
                        .arg(entry.id)
                        .query_async(&mut conn)
                        .await
                        .unwrap_or(0);
                }
            }
        }
    }
}
