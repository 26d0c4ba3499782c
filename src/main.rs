use movebid_core::config::Config;
use movebid_core::processor::ProcessorClient;
use movebid_core::services::{
    self, CommissionRates, CommissionService, DeliveryService, OutboxService, PaymentService,
    QuoteService, WebhookSink,
};
use movebid_core::{AppState, create_app, db};
use sqlx::migrate::Migrator;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Setup logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Database pool
    let pool = db::create_pool(&config).await?;

    // Run migrations
    let migrator = Migrator::new(Path::new("./migrations")).await?;
    migrator.run(&pool).await?;
    tracing::info!("Database migrations completed");

    let rates = CommissionRates {
        standard: config.commission_rate_standard,
        discounted: config.commission_rate_discounted,
    };
    let processor = ProcessorClient::new(
        config.processor_base_url.clone(),
        config.processor_key_id.clone(),
        config.processor_key_secret.clone(),
    );
    tracing::info!("Payment processor client initialized for {}", config.processor_base_url);

    // Background outbox dispatcher
    let sink = Arc::new(WebhookSink::new(
        config.notify_endpoint.clone(),
        config.notify_secret.clone(),
    ));
    tokio::spawn(services::run_dispatcher(pool.clone(), sink));

    let state = AppState {
        db: pool.clone(),
        rates,
        quotes: QuoteService::new(pool.clone()),
        payments: PaymentService::new(
            pool.clone(),
            processor,
            rates,
            config.currency.clone(),
            config.payment_webhook_secret.clone(),
        ),
        commission: CommissionService::new(pool.clone(), rates),
        delivery: DeliveryService::new(pool.clone()),
        outbox: OutboxService::new(pool),
    };
    let app = create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
