//! Entroscan indexer binary.
//!
//! Entry point for the scan loop: load configuration, open the store,
//! create the tables idempotently, and run the scheduler until the
//! process is terminated. Restart resumes from the persisted checkpoint.

use std::sync::Arc;

use entroscan_indexer::config::IndexerConfig;
use entroscan_indexer::events::Scheduler;
use entroscan_indexer::rpc::RpcClient;
use entroscan_indexer::store::{EventStore, PgStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,entroscan_indexer=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Missing or invalid configuration is fatal.
    let config = IndexerConfig::from_env()?;

    tracing::info!("Starting Entroscan indexer");
    tracing::info!("RPC endpoint: {}", config.rpc_url);
    tracing::info!("Contract: {}", config.contract_address);
    tracing::info!("Start block: {}", config.start_block);

    let store = Arc::new(PgStore::connect(&config.database_url).await?);
    store.initialize(config.start_block).await?;

    let client = Arc::new(RpcClient::new(
        &config.rpc_url,
        &config.contract_address,
        config.rpc_timeout(),
    )?);

    let mut scheduler = Scheduler::new(client, store, &config);

    tokio::select! {
        () = scheduler.run() => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Shutting down indexer");
        }
    }

    Ok(())
}
