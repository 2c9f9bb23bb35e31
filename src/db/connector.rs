//! Physical connection factory.
//!
//! The pool manager never talks to the driver directly; it goes through a
//! [`Connector`] so the lifecycle can be exercised without a live server.

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{ConnectOptions, Connection};

use crate::config::MySqlConfig;

/// Opens, probes and terminates connections of one kind.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Connection: Send + 'static;

    /// Open a new connection to the server.
    async fn connect(&self) -> Result<Self::Connection, sqlx::Error>;

    /// Run a trivial liveness probe on an open connection.
    async fn ping(&self, conn: &mut Self::Connection) -> Result<(), sqlx::Error>;

    /// Terminate a connection gracefully.
    async fn close(&self, conn: Self::Connection) -> Result<(), sqlx::Error>;

    /// Human-readable target for log events (never includes secrets).
    fn target(&self) -> String;
}

/// Connector for a MySQL server.
#[derive(Debug, Clone)]
pub struct MySqlConnector {
    options: MySqlConnectOptions,
    target: String,
}

impl MySqlConnector {
    pub fn new(config: &MySqlConfig) -> Self {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password);

        Self {
            options,
            target: format!("{}@{}:{}", config.user, config.host, config.port),
        }
    }
}

#[async_trait]
impl Connector for MySqlConnector {
    type Connection = MySqlConnection;

    async fn connect(&self) -> Result<MySqlConnection, sqlx::Error> {
        self.options.connect().await
    }

    async fn ping(&self, conn: &mut MySqlConnection) -> Result<(), sqlx::Error> {
        let one: i64 = sqlx::query_scalar("SELECT 1").fetch_one(&mut *conn).await?;
        if one == 1 {
            Ok(())
        } else {
            Err(sqlx::Error::Protocol(format!("liveness probe returned {one}")))
        }
    }

    async fn close(&self, conn: MySqlConnection) -> Result<(), sqlx::Error> {
        conn.close().await
    }

    fn target(&self) -> String {
        self.target.clone()
    }
}
