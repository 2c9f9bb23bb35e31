//! Network layer.
//!
//! Plain TCP is bound with `tokio::net::TcpListener`; when `[server.tls]` is
//! configured the listener is served through `axum-server` with rustls.

pub mod tls;
