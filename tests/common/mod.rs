//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use mysql_admin::config::AdminConfig;
use mysql_admin::db::{MySqlConnector, MySqlPoolManager, PoolSettings};
use mysql_admin::http::server::AppState;
use mysql_admin::http::HttpServer;
use mysql_admin::lifecycle::Shutdown;

pub const ADMIN_KEY: &str = "test-secret";

/// A running admin server backed by an uninitialized pool.
pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    pub shutdown: Shutdown,
    _log_dir: tempfile::TempDir,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub fn test_config() -> AdminConfig {
    let mut config = AdminConfig::default();
    config.auth.admin_secret_key = ADMIN_KEY.to_string();
    config.auth.max_login_attempts = 3;
    config.auth.window_seconds = 60;
    // Never contacted: the pool stays uninitialized.
    config.mysql.host = "127.0.0.1".to_string();
    config.mysql.port = 1;
    config
}

/// Start a server on an ephemeral port.
pub async fn start_admin_server(mut config: AdminConfig) -> TestServer {
    let log_dir = tempfile::tempdir().unwrap();
    config.auth.login_log_path = log_dir.path().join("login.txt").display().to_string();
    config.server.static_dir = log_dir.path().display().to_string();

    let pool = Arc::new(MySqlPoolManager::new(
        MySqlConnector::new(&config.mysql),
        PoolSettings::from(&config.mysql),
    ));
    let state = AppState::new(config, pool);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let (_, config_updates) = mpsc::unbounded_channel();
    let server = HttpServer::new(state.clone());

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer {
        addr,
        state,
        shutdown,
        _log_dir: log_dir,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}
