//! Offers Read Server
//!
//! Serves the local offer mirror over HTTP and exposes a task route that
//! runs one sync pass against the upstream catalog.
//!
//! # Configuration
//!
//! Read from the offers config file (`OFFERS_CONFIG`, default
//! ~/.config/offers/config.yaml) with environment overrides:
//! - `OFFERS_PORT`: Port to listen on (default: 8080)
//! - `OFFERS_MERCHANT_ID` / `MERCHANT_ID`: Account mirrored by `/tasks/update_db`
//! - `OFFERS_DATABASE_PATH`: SQLite database path
//! - `OFFERS_CATALOG_ENDPOINT` / `GOOGLE_SHOPPING_SAMPLES_ENDPOINT`: Catalog base URL
//! - `OFFERS_ACCESS_TOKEN`: Bearer token sent to the catalog
//!
//! # Config File Format
//!
//! ```yaml
//! merchant_id: 123456789
//! store:
//!   backend: sqlite
//! server:
//!   task_token: "your-secret-token-here"
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use offers::config::Config;
use offers::server::{router, AppState};
use offers_core::{open_store, OfferStore, SyncDriver};

#[tokio::main]
async fn main() {
    offers::init_tracing();

    if let Err(e) = run().await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::var("OFFERS_CONFIG").ok().map(PathBuf::from);
    let config = Config::load(config_path)?;

    if let Some(path) = &config.config_file {
        tracing::info!("Config file: {}", path.display());
    }
    tracing::info!(
        backend = %config.store_backend.value,
        endpoint = %config.catalog_endpoint.value,
        "Opening offer store"
    );

    let store = open_store(&config.store_backend(), config.list_limit.value).await?;
    let catalog = Arc::new(config.http_catalog()?);
    let driver = SyncDriver::new(catalog, store.clone());

    if config.merchant_id.value.is_none() {
        tracing::warn!("No merchant ID configured - /tasks/update_db will fail");
    }
    if config.task_token.is_none() {
        tracing::warn!("No task token configured - /tasks/update_db is unauthenticated");
    }

    let state = AppState::new(store.clone(), driver, config.merchant_id.value)
        .with_task_token(config.task_token.clone());
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port.value));
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
