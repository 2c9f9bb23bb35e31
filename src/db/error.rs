//! Connection pool errors.

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the pool manager.
///
/// Every variant maps to "service unavailable" at the HTTP layer; callers
/// retry at the request level, the pool never retries internally.
#[derive(Debug, Error)]
pub enum PoolError {
    /// acquire/release outside the ready window (before `initialize` or after `close`).
    #[error("Connection pool not initialized. Call initialize() first.")]
    NotInitialized,

    /// The server was unreachable or rejected the credentials during `initialize`.
    #[error("Failed to initialize connection pool: {0}")]
    ConnectionSetup(#[source] sqlx::Error),

    /// The server refused a new connection during `acquire`.
    #[error("Failed to acquire connection: {0}")]
    Acquisition(#[source] sqlx::Error),

    /// No connection became free within the configured bound.
    #[error("Timed out after {0:?} waiting for a free connection")]
    AcquireTimeout(Duration),

    /// One or more connections failed to terminate during `close`.
    #[error("Error closing connection pool: {failed} of {total} connection(s) failed to close: {detail}")]
    Shutdown {
        failed: usize,
        total: usize,
        detail: String,
    },
}

/// Server error number carried by a driver error, if any.
pub fn mysql_error_number(err: &sqlx::Error) -> Option<u16> {
    err.as_database_error()
        .and_then(|db| db.try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>())
        .map(|db| db.number())
}

/// Server-side message for a driver error, falling back to its display form.
pub fn mysql_error_message(err: &sqlx::Error) -> String {
    match err.as_database_error() {
        Some(db) => db.message().to_string(),
        None => err.to_string(),
    }
}
