//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Login request:
//!     → client_ip.rs (X-Forwarded-For / X-Real-Ip / peer)
//!     → rate_limit.rs (sliding window per IP)
//!     → auth.rs (constant-time key comparison)
//!
//! Protected request:
//!     → auth.rs middleware (X-Admin-Key) → handler
//! ```

pub mod auth;
pub mod client_ip;
pub mod rate_limit;

pub use rate_limit::{RateLimitDecision, RateLimiter};
