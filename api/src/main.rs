//! Entroscan API server binary.
//!
//! Entry point for the read-only query API.

use std::env;
use std::sync::Arc;

use anyhow::Context;
use entroscan_api::{AppState, Server, ServerConfig};
use entroscan_indexer::store::PgStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,entroscan_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("API_PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .context("API_PORT must be a valid port number")?;
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    // The API gets its own bounded pool, separate from the indexer's.
    let store = Arc::new(PgStore::connect_with(&database_url, 4).await?);
    let state = AppState::new(store);

    let config = ServerConfig::new(host, port);
    tracing::info!(
        "Starting Entroscan API server on {}:{}",
        config.host,
        config.port
    );

    let server = Server::new(config, state);
    server.run().await?;

    Ok(())
}
