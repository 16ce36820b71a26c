pub mod buffer;
pub mod commerce;
pub mod config;
pub mod domain {
    pub mod outcome;
    pub mod pending_result;
}
pub mod http {
    pub mod handlers {
        pub mod ops;
        pub mod payment_status;
        pub mod webhooks;
    }
}
pub mod providers;
pub mod repo {
    pub mod carts_repo;
    pub mod order_links_repo;
}
pub mod service {
    pub mod order_created;
    pub mod order_events;
    pub mod reconciliation;
}

#[derive(Clone)]
pub struct AppState {
    pub providers: providers::Providers,
    pub reconciliation: service::reconciliation::ReconciliationService,
    pub buffer_store: buffer::ResultBufferStore,
    pub pool: sqlx::PgPool,
    pub redis_client: redis::Client,
}
