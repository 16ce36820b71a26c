use axum::routing::{get, post};
use axum::Router;
use payment_reconciler::buffer::store_pg::PgBufferStore;
use payment_reconciler::buffer::store_redis::RedisBufferStore;
use payment_reconciler::buffer::{BufferBackend, ResultBufferStore};
use payment_reconciler::commerce::notifier_redis::RedisNotifier;
use payment_reconciler::commerce::payments_api::PaymentsApiClient;
use payment_reconciler::config::AppConfig;
use payment_reconciler::providers::bold::BoldAdapter;
use payment_reconciler::providers::payvalida::PayvalidaAdapter;
use payment_reconciler::providers::wompi::WompiAdapter;
use payment_reconciler::providers::Providers;
use payment_reconciler::repo::carts_repo::CartsRepo;
use payment_reconciler::repo::order_links_repo::OrderLinksRepo;
use payment_reconciler::service::order_created::OrderCreatedConsumer;
use payment_reconciler::service::order_events::OrderEventListener;
use payment_reconciler::service::reconciliation::ReconciliationService;
use payment_reconciler::AppState;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&cfg.database_url)
        .await?;

    let redis_client = redis::Client::open(cfg.redis_url.clone())?;

    let buffer_store = ResultBufferStore::new(vec![
        Arc::new(RedisBufferStore::new(redis::Client::open(cfg.redis_url.clone())?))
            as Arc<dyn BufferBackend>,
        Arc::new(PgBufferStore::new(pool.clone())) as Arc<dyn BufferBackend>,
    ]);

    let orders = Arc::new(OrderLinksRepo { pool: pool.clone() });
    let carts = Arc::new(CartsRepo { pool: pool.clone() });
    let payments = Arc::new(PaymentsApiClient {
        base_url: cfg.commerce_api_url.clone(),
        api_token: cfg.commerce_api_token.clone(),
        timeout_ms: cfg.commerce_timeout_ms,
        client: reqwest::Client::new(),
    });
    let notifier = Arc::new(RedisNotifier {
        client: redis::Client::open(cfg.redis_url.clone())?,
        stream_key: cfg.notifications_stream_key.clone(),
    });

    let reconciliation = ReconciliationService {
        orders: orders.clone(),
        carts: carts.clone(),
        payments: payments.clone(),
        notifier: notifier.clone(),
        buffer: buffer_store.clone(),
    };

    let consumer = OrderCreatedConsumer {
        orders: orders.clone(),
        payments: payments.clone(),
        notifier: notifier.clone(),
        buffer: buffer_store.clone(),
    };
    let listener = OrderEventListener {
        redis_client: redis::Client::open(cfg.redis_url.clone())?,
        stream_key: cfg.orders_stream_key.clone(),
        group: cfg.orders_stream_group.clone(),
        consumer_name: std::env::var("ORDERS_CONSUMER_NAME")
            .unwrap_or_else(|_| "payment-reconciler-1".to_string()),
        consumer,
    };
    tokio::spawn(listener.run());

    let providers = Providers {
        payvalida: Arc::new(PayvalidaAdapter {
            username: cfg.payvalida_username.clone(),
            password: cfg.payvalida_password.clone(),
            test_mode: cfg.payvalida_test_mode,
            deploy_mode: cfg.deploy_mode,
        }),
        wompi: Arc::new(WompiAdapter {
            events_secret: cfg.wompi_events_secret.clone(),
        }),
        bold: Arc::new(BoldAdapter {
            events_secret: cfg.bold_events_secret.clone(),
            deploy_mode: cfg.deploy_mode,
        }),
    };

    let state = AppState {
        providers,
        reconciliation,
        buffer_store,
        pool,
        redis_client,
    };

    let app = Router::new()
        .route("/health", get(payment_reconciler::http::handlers::ops::health))
        .route(
            "/webhooks/payvalida",
            post(payment_reconciler::http::handlers::webhooks::payvalida_webhook),
        )
        .route(
            "/webhooks/wompi",
            post(payment_reconciler::http::handlers::webhooks::wompi_webhook),
        )
        .route(
            "/webhooks/bold",
            post(payment_reconciler::http::handlers::webhooks::bold_webhook),
        )
        .route(
            "/payment-status/:cart_id",
            get(payment_reconciler::http::handlers::payment_status::get_payment_status),
        )
        .route("/ops/readiness", get(payment_reconciler::http::handlers::ops::readiness))
        .route("/ops/liveness", get(payment_reconciler::http::handlers::ops::liveness))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
