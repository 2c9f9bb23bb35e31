//! Metrics collection and exposition.
//!
//! # Metrics
//! - `admin_http_requests_total` (counter): requests by method, status
//! - `admin_login_attempts_total` (counter): logins by result
//! - `admin_rate_limited_total` (counter): logins rejected by the limiter
//! - `admin_pool_connections` (gauge): pool connections by state
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16) {
    counter!(
        "admin_http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_login(success: bool) {
    let result = if success { "success" } else { "failed" };
    counter!("admin_login_attempts_total", "result" => result).increment(1);
}

pub fn record_rate_limited() {
    counter!("admin_rate_limited_total").increment(1);
}

pub fn record_pool_status(idle: usize, in_use: usize) {
    gauge!("admin_pool_connections", "state" => "idle").set(idle as f64);
    gauge!("admin_pool_connections", "state" => "in_use").set(in_use as f64);
}
