//! Database administration services.
//!
//! # Data Flow
//! ```text
//! api handler
//!     → identifier.rs (validate names and filters)
//!     → database.rs / table.rs / data.rs / query.rs
//!         → pool.acquire() → SQL → settle()
//!     → error.rs (MySQL error number → ServiceError)
//! ```
//!
//! Every service borrows the shared pool; none holds a connection across
//! calls.

pub mod data;
pub mod database;
pub mod error;
pub mod identifier;
pub mod query;
pub mod table;

pub use data::DataService;
pub use database::DatabaseService;
pub use error::ServiceError;
pub use query::{QueryResponse, QueryService};
pub use table::{ColumnInfo, TableData, TableService};

use crate::db::{MySqlPoolManager, MySqlPooled};

/// Give a connection back after a statement ran.
///
/// Connections whose transport failed are discarded; server-side errors
/// leave the connection usable.
pub(crate) fn settle<T>(pool: &MySqlPoolManager, conn: MySqlPooled, result: &Result<T, sqlx::Error>) {
    match result {
        Err(e @ (sqlx::Error::Io(_) | sqlx::Error::Protocol(_) | sqlx::Error::Tls(_) | sqlx::Error::WorkerCrashed)) => {
            tracing::warn!(connection_id = %conn.id(), error = %e, "Dropping connection after transport failure");
            conn.discard();
        }
        _ => pool.release(conn),
    }
}
