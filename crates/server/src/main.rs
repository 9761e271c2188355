use std::sync::Arc;

use anyhow::Context;
use quire_core::{FetchConfig, IngestConfig, Ingestor};
use quire_server::config::ServerConfig;
use quire_server::pg::PgStore;
use quire_server::{AppState, router};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "quire_server=info,quire_core=info,tower_http=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)))
        .init();

    let config = ServerConfig::from_env()?;
    let store = PgStore::connect(&config.database_url, config.pool_size)
        .await
        .context("Failed to connect to the database")?;

    let ingest = IngestConfig {
        fetch: FetchConfig { timeout: config.fetch_timeout, ..Default::default() },
        ..Default::default()
    };
    let ingestor = Ingestor::new(Arc::new(store), ingest).context("Failed to build the ingestor")?;
    let app = router(AppState::new(ingestor), config.request_timeout());

    let listener = TcpListener::bind(config.bind).await.with_context(|| format!("Failed to bind {}", config.bind))?;
    info!(addr = %config.bind, "listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("failed to install the ctrl-c handler");
        std::future::pending::<()>().await;
    }
}
