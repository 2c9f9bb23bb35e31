//! Web administration layer for MySQL servers.

pub mod api;
pub mod config;
pub mod db;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod security;
pub mod services;

pub use config::schema::AdminConfig;
pub use db::{MySqlPoolManager, PoolManager};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
