//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (pool bounds, login window)
//! - Check that addresses parse and TLS files exist
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AdminConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::AdminConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} is not a valid socket address: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("mysql.pool_min ({min}) must be between 1 and mysql.pool_max ({max})")]
    PoolBounds { min: usize, max: usize },

    #[error("{field} must be at least 1")]
    NotPositive { field: &'static str },

    #[error("server.env must be \"dev\" or \"prod\", got \"{0}\"")]
    UnknownEnv(String),

    #[error("{field} points to a missing file: {path}")]
    MissingFile { field: &'static str, path: String },

    #[error("environment variable {name} has invalid value \"{value}\"")]
    InvalidOverride { name: &'static str, value: String },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AdminConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "server.bind_address",
            value: config.server.bind_address.clone(),
        });
    }
    if !matches!(config.server.env.as_str(), "dev" | "prod") {
        errors.push(ValidationError::UnknownEnv(config.server.env.clone()));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::NotPositive { field: "server.request_timeout_secs" });
    }
    if let Some(tls) = &config.server.tls {
        if !Path::new(&tls.cert_path).exists() {
            errors.push(ValidationError::MissingFile {
                field: "server.tls.cert_path",
                path: tls.cert_path.clone(),
            });
        }
        if !Path::new(&tls.key_path).exists() {
            errors.push(ValidationError::MissingFile {
                field: "server.tls.key_path",
                path: tls.key_path.clone(),
            });
        }
    }

    if config.mysql.host.trim().is_empty() {
        errors.push(ValidationError::Empty { field: "mysql.host" });
    }
    if config.mysql.user.trim().is_empty() {
        errors.push(ValidationError::Empty { field: "mysql.user" });
    }
    if config.mysql.pool_min == 0 || config.mysql.pool_min > config.mysql.pool_max {
        errors.push(ValidationError::PoolBounds {
            min: config.mysql.pool_min,
            max: config.mysql.pool_max,
        });
    }
    if config.mysql.acquire_timeout_secs == Some(0) {
        errors.push(ValidationError::NotPositive { field: "mysql.acquire_timeout_secs" });
    }

    if config.auth.admin_secret_key.is_empty() {
        errors.push(ValidationError::Empty { field: "auth.admin_secret_key" });
    }
    if config.auth.max_login_attempts == 0 {
        errors.push(ValidationError::NotPositive { field: "auth.max_login_attempts" });
    }
    if config.auth.window_seconds == 0 {
        errors.push(ValidationError::NotPositive { field: "auth.window_seconds" });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
