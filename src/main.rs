//! Bakery Storefront - catalog, carts, checkout and order confirmations

use std::sync::Arc;

use anyhow::Result;
use bakery_storefront::api::{self, AppState};
use bakery_storefront::config::Config;
use bakery_storefront::services::events::EventPublisher;
use bakery_storefront::services::notifications::{LogTransport, MessageTransport, NatsMailTransport};
use bakery_storefront::services::order_number::TimestampedGenerator;
use bakery_storefront::services::{Dependencies, Stores};
use bakery_storefront::store::memory::MemoryCatalog;
use bakery_storefront::store::postgres::{PostgresCatalog, PostgresCustomers, PostgresOrders};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = Config::from_env()?;

    let stores = match &config.database_url {
        Some(url) => {
            let db = PgPoolOptions::new().max_connections(10).connect(url).await?;
            sqlx::migrate!("./migrations").run(&db).await?;
            tracing::info!("using postgres stores");
            Stores {
                catalog: Arc::new(PostgresCatalog::new(db.clone())),
                customers: Arc::new(PostgresCustomers::new(db.clone())),
                orders: Arc::new(PostgresOrders::new(db)),
            }
        }
        None => {
            let catalog = match &config.catalog_file {
                Some(path) => MemoryCatalog::from_json_file(path)?,
                None => MemoryCatalog::new(),
            };
            tracing::warn!("DATABASE_URL not set, orders are kept in memory only");
            Stores::memory(catalog)
        }
    };

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, confirmations go to the log");
                None
            }
        },
        None => None,
    };
    let transport: Arc<dyn MessageTransport> = match &nats {
        Some(client) => Arc::new(NatsMailTransport::new(client.clone())),
        None => Arc::new(LogTransport),
    };
    let events = nats.map(EventPublisher::new).unwrap_or_default();

    let deps = Dependencies::new(stores)
        .with_numbers(Arc::new(TimestampedGenerator::new(config.order_number_prefix.clone())))
        .with_fees(config.delivery_fee_policy())
        .with_transport(transport)
        .with_events(events);
    let app = api::router(AppState::new(deps, &config));

    tracing::info!("🎂 Bakery storefront listening on 0.0.0.0:{}", config.port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?, app).await?;
    Ok(())
}
