//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the admin
//! service. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the admin service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AdminConfig {
    /// HTTP listener and request handling settings.
    pub server: ServerConfig,

    /// MySQL connection and pool settings.
    pub mysql: MySqlConfig,

    /// Admin key and login rate limiting.
    pub auth: AuthConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Display name reported by `GET /api`.
    pub name: String,

    /// Deployment environment ("dev" or "prod").
    pub env: String,

    /// Bind address (e.g., "127.0.0.1:8000").
    pub bind_address: String,

    /// Directory served for every path not claimed by the API.
    pub static_dir: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "MySQL-Admin API".to_string(),
            env: "dev".to_string(),
            bind_address: "127.0.0.1:8000".to_string(),
            static_dir: "frontend".to_string(),
            request_timeout_secs: 30,
            max_body_size: 2 * 1024 * 1024, // 2MB
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// MySQL server and pool configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MySqlConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,

    /// Connections opened eagerly by `initialize`.
    pub pool_min: usize,

    /// Upper bound on open connections.
    pub pool_max: usize,

    /// Bound on how long `acquire` waits for a free connection.
    /// Unset means wait until a peer releases one.
    pub acquire_timeout_secs: Option<u64>,
}

impl Default for MySqlConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            user: "root".to_string(),
            password: "123456".to_string(),
            pool_min: 1,
            pool_max: 10,
            acquire_timeout_secs: None,
        }
    }
}

/// Admin authentication configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared secret expected in `X-Admin-Key` and at login.
    pub admin_secret_key: String,

    /// Failed logins allowed per client IP within the window.
    pub max_login_attempts: u32,

    /// Sliding window length in seconds.
    pub window_seconds: u64,

    /// Append-only login audit file.
    pub login_log_path: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            // WARNING: This is a placeholder! Change this in production.
            admin_secret_key: "admin123".to_string(),
            max_login_attempts: 3,
            window_seconds: 60,
            login_log_path: "logs/login.txt".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Base name of the rolling log file.
    pub log_name: String,

    /// Directory for log files.
    pub log_dir: String,

    /// Write logs to `log_dir/<log_name>.log` in addition to stdout.
    pub file_logging: bool,

    /// Enable Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_name: "mysql-admin".to_string(),
            log_dir: "logs".to_string(),
            file_logging: true,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
