//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, console + rolling file)
//!     → metrics.rs (counters and pool gauges)
//!
//! Login endpoint additionally writes:
//!     → audit.rs (append-only login trail)
//! ```

pub mod audit;
pub mod logging;
pub mod metrics;
