//! Database access layer.
//!
//! # Data Flow
//! ```text
//! AppState
//!     → pool.rs (acquire a PooledConnection)
//!     → services (SQL over the connection)
//!     → rows.rs (text-protocol rows → JSON)
//!     → pool.rs (release / drop returns the slot)
//! ```

pub mod connector;
pub mod error;
pub mod pool;
pub mod rows;

pub use connector::{Connector, MySqlConnector};
pub use error::PoolError;
pub use pool::{ConnectionId, PoolLifecycle, PoolManager, PoolSettings, PoolStatus, PooledConnection};

/// The pool manager used by the server.
pub type MySqlPoolManager = PoolManager<MySqlConnector>;

/// A connection checked out of [`MySqlPoolManager`].
pub type MySqlPooled = PooledConnection<sqlx::MySqlConnection>;
