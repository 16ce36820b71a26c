use crate::domain::pending_result::PendingPaymentResult;
use anyhow::Result;
use std::sync::Arc;

pub mod store_pg;
pub mod store_redis;

/// One storage strategy in the buffer chain. Backends agree on semantics:
/// `save` upserts by cart id, `get` only returns live entries, `clear` makes
/// subsequent `get`s return nothing (hard delete or soft processed-mark).
#[async_trait::async_trait]
pub trait BufferBackend: Send + Sync {
    fn name(&self) -> &'static str;
    async fn save(&self, result: &PendingPaymentResult) -> Result<()>;
    async fn get(&self, cart_id: &str) -> Result<Option<PendingPaymentResult>>;
    async fn clear(&self, cart_id: &str) -> Result<()>;
}

/// Ordered backend chain (Redis first, Postgres fallback). A backend error on
/// `get`/`clear` logs and falls through to the next; losing a `save` is a
/// correctness hazard, so it only fails once every backend has refused it.
#[derive(Clone)]
pub struct ResultBufferStore {
    backends: Arc<Vec<Arc<dyn BufferBackend>>>,
}

impl ResultBufferStore {
    pub fn new(backends: Vec<Arc<dyn BufferBackend>>) -> Self {
        Self {
            backends: Arc::new(backends),
        }
    }

    pub async fn save(&self, result: &PendingPaymentResult) -> Result<()> {
        let mut last_err = None;
        for backend in self.backends.iter() {
            match backend.save(result).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        backend = backend.name(),
                        cart_id = %result.cart_id,
                        "buffer save failed, trying next backend: {e:#}"
                    );
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("no buffer backend configured")))
    }

    pub async fn get(&self, cart_id: &str) -> Option<PendingPaymentResult> {
        let now = chrono::Utc::now();
        for backend in self.backends.iter() {
            match backend.get(cart_id).await {
                // Expiry is lazy; whatever the backend returns is re-checked here.
                Ok(found) => return found.filter(|r| r.is_live(now)),
                Err(e) => {
                    tracing::warn!(
                        backend = backend.name(),
                        cart_id,
                        "buffer get failed, trying next backend: {e:#}"
                    );
                }
            }
        }
        None
    }

    pub async fn clear(&self, cart_id: &str) {
        for backend in self.backends.iter() {
            match backend.clear(cart_id).await {
                Ok(()) => return,
                Err(e) => {
                    tracing::warn!(
                        backend = backend.name(),
                        cart_id,
                        "buffer clear failed, trying next backend: {e:#}"
                    );
                }
            }
        }
    }
}
