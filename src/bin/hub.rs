use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use ping_monitor::{
    api::{ApiConfig, ApiState, spawn_api_server},
    broadcast::SubscriberRegistry,
    config::{Config, StorageConfig, read_config_file},
    monitor::PingMonitor,
    probe::TcpProbe,
    storage::{
        MeasurementStore, MemoryStore,
        retention::{CLEANUP_INTERVAL, spawn_retention_task},
    },
    util::get_log_level,
};
use tracing::{info, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file (JSON). Built-in defaults are used without one.
    #[arg(short)]
    file: Option<String>,
}

fn init() {
    let level = get_log_level();
    let filter = filter::Targets::new().with_targets(vec![
        ("ping_monitor", level),
        ("ping_monitor_hub", level),
        ("tower_http", level),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

/// Connect the configured store. Failing here aborts startup.
async fn open_store(storage: &StorageConfig) -> anyhow::Result<Arc<dyn MeasurementStore>> {
    match storage {
        StorageConfig::None { .. } => {
            info!("using in-memory storage, measurements are not persisted");
            Ok(Arc::new(MemoryStore::new()))
        }

        #[cfg(feature = "storage-sqlite")]
        StorageConfig::Sqlite { path, .. } => {
            let store = ping_monitor::storage::sqlite::SqliteStore::new(path).await?;
            Ok(Arc::new(store))
        }

        #[cfg(not(feature = "storage-sqlite"))]
        StorageConfig::Sqlite { .. } => {
            anyhow::bail!("sqlite storage requested but the storage-sqlite feature is disabled")
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = match &args.file {
        Some(file) => read_config_file(file)?,
        None => Config::default(),
    }
    .with_env_overrides(|key| std::env::var(key).ok());

    let storage = config.storage();
    let store = open_store(&storage)
        .await
        .context("failed to connect to storage")?;

    let retention = spawn_retention_task(
        Arc::clone(&store),
        storage.retention_days(),
        CLEANUP_INTERVAL,
    );

    let monitor = PingMonitor::new(
        config.monitor_settings(),
        config.targets(),
        Arc::new(TcpProbe::new(config.probe.port)),
        Arc::clone(&store),
        SubscriberRegistry::new(),
    );

    if config.autostart() {
        monitor.start().await;
    }

    let api_config = ApiConfig {
        bind_addr: config.api.bind,
        enable_cors: config.api.enable_cors,
    };
    let addr = spawn_api_server(api_config, ApiState::new(monitor.clone())).await?;
    info!("hub ready, API listening on {addr}");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutting down");

    if monitor.is_running().await {
        monitor.shutdown().await;
    }
    retention.abort();
    if let Err(e) = store.close().await {
        warn!("failed to close storage: {e}");
    }

    Ok(())
}
