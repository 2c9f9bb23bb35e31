//! HTTP layer.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware stack)
//!     → extract.rs (body, query, path extraction)
//!     → api (route handlers)
//!     → response.rs (errors → JSON bodies)
//! ```

pub mod extract;
pub mod response;
pub mod server;

pub use response::ApiError;
pub use server::{AppState, HttpServer};
