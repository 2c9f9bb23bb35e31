//! Startup orchestration.
//!
//! Order: metrics → pool (fatal on failure) → liveness probe → config
//! watcher → listener → serve. On shutdown the server drains first, then
//! the pool is closed.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::config::watcher::ConfigWatcher;
use crate::config::AdminConfig;
use crate::db::{MySqlConnector, MySqlPoolManager, PoolError, PoolSettings};
use crate::http::server::{AppState, HttpServer};
use crate::lifecycle::Shutdown;
use crate::net::tls::load_tls_config;
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("database pool: {0}")]
    Pool(#[from] PoolError),

    #[error("invalid {field} address '{value}'")]
    Address { field: &'static str, value: String },

    #[error("config watcher: {0}")]
    Watch(#[from] notify::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Run the service until a shutdown signal arrives.
///
/// `config_path` enables hot reload when the configuration came from a file.
pub async fn run(config: AdminConfig, config_path: Option<PathBuf>) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        let addr = parse_addr("observability.metrics_address", &config.observability.metrics_address)?;
        metrics::init_metrics(addr);
    }

    let pool = Arc::new(MySqlPoolManager::new(
        MySqlConnector::new(&config.mysql),
        PoolSettings::from(&config.mysql),
    ));
    run_with_pool(config, config_path, pool).await
}

/// Initialize `pool`, serve, and close the pool on every exit path once it
/// has been initialized.
pub async fn run_with_pool(
    config: AdminConfig,
    config_path: Option<PathBuf>,
    pool: Arc<MySqlPoolManager>,
) -> Result<(), StartupError> {
    pool.initialize().await?;

    let served = serve(config, config_path, pool.clone()).await;

    if let Err(e) = pool.close().await {
        tracing::error!(error = %e, "Connection pool did not close cleanly");
    }
    served?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn serve(
    config: AdminConfig,
    config_path: Option<PathBuf>,
    pool: Arc<MySqlPoolManager>,
) -> Result<(), StartupError> {
    if pool.test_connection().await {
        tracing::info!("Database connection verified");
    } else {
        tracing::warn!("Database liveness probe failed after pool initialization");
    }

    // The watcher must stay alive for the life of the server.
    let (_watcher, config_updates) = match &config_path {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let addr = parse_addr("server.bind_address", &config.server.bind_address)?;
    let tls = config.server.tls.clone();
    let server = HttpServer::new(AppState::new(config, pool));

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    match tls {
        Some(tls) => {
            let rustls = load_tls_config(&tls).await?;
            server.run_tls(addr, rustls, config_updates, shutdown.subscribe()).await?;
        }
        None => {
            let listener = TcpListener::bind(addr).await?;
            server.run(listener, config_updates, shutdown.subscribe()).await?;
        }
    }
    Ok(())
}

fn parse_addr(field: &'static str, value: &str) -> Result<SocketAddr, StartupError> {
    value.parse().map_err(|_| StartupError::Address {
        field,
        value: value.to_string(),
    })
}
