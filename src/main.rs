//! mysql-admin
//!
//! Web administration layer over a MySQL server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Browser / admin-cli
//!            │
//!            ▼
//!   ┌──────────────────────────────────────────────────────────┐
//!   │  http::server   (trace, request id, timeout, body limit) │
//!   │       │                                                  │
//!   │       ├── /api/auth/verify ─▶ security (client ip,       │
//!   │       │                        rate limiter, audit)      │
//!   │       │                                                  │
//!   │       ├── /api/** ─▶ security::auth (X-Admin-Key)        │
//!   │       │                 │                                │
//!   │       │                 ▼                                │
//!   │       │            services ─▶ db::pool ─▶ MySQL         │
//!   │       │                                                  │
//!   │       └── fallback ─▶ static frontend                    │
//!   │                                                          │
//!   │  config (TOML + env, hot-reloaded auth)                  │
//!   │  observability (tracing, metrics)   lifecycle (signals)  │
//!   └──────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use mysql_admin::config::loader::load;
use mysql_admin::lifecycle::startup;
use mysql_admin::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "mysql-admin", version, about = "Web administration layer for MySQL")]
struct Args {
    /// TOML configuration file. Without it, defaults plus environment overrides apply.
    #[arg(short, long, env = "MYSQL_ADMIN_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return Err(e.into());
        }
    };

    let _log_guard = init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        env = %config.server.env,
        bind_address = %config.server.bind_address,
        mysql_host = %config.mysql.host,
        mysql_port = config.mysql.port,
        pool_min = config.mysql.pool_min,
        pool_max = config.mysql.pool_max,
        "Configuration loaded"
    );

    if let Err(e) = startup::run(config, args.config).await {
        tracing::error!(error = %e, "Fatal error");
        return Err(e.into());
    }
    Ok(())
}
