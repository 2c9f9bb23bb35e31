//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::config::schema::AdminConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AdminConfig, ConfigError> {
    load_config_with(path, |name| std::env::var(name).ok())
}

fn load_config_with<F>(path: &Path, lookup: F) -> Result<AdminConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let content = fs::read_to_string(path)?;
    let mut config: AdminConfig = toml::from_str(&content)?;

    let override_errors = apply_env_overrides(&mut config, lookup);
    finish(config, override_errors)
}

/// Build configuration from defaults plus environment overrides only.
pub fn load_from_env() -> Result<AdminConfig, ConfigError> {
    let mut config = AdminConfig::default();
    let override_errors = apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    finish(config, override_errors)
}

/// Load from `path` when given, otherwise from the environment.
pub fn load(path: Option<&Path>) -> Result<AdminConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => load_from_env(),
    }
}

fn finish(
    config: AdminConfig,
    mut errors: Vec<ValidationError>,
) -> Result<AdminConfig, ConfigError> {
    if let Err(validation) = validate_config(&config) {
        errors.extend(validation);
    }
    if errors.is_empty() {
        Ok(config)
    } else {
        Err(ConfigError::Validation(errors))
    }
}

/// Apply the environment variables the service honours on top of `config`.
///
/// `lookup` abstracts `std::env::var` so overrides can be exercised without
/// touching the process environment.
pub fn apply_env_overrides<F>(config: &mut AdminConfig, lookup: F) -> Vec<ValidationError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut errors = Vec::new();

    if let Some(v) = lookup("SERVER_BIND_ADDRESS") {
        config.server.bind_address = v;
    }
    if let Some(v) = lookup("SERVER_ENV") {
        config.server.env = v;
    }
    if let Some(v) = lookup("MYSQL_HOST") {
        config.mysql.host = v;
    }
    if let Some(v) = lookup("MYSQL_USER") {
        config.mysql.user = v;
    }
    if let Some(v) = lookup("MYSQL_PASSWORD") {
        config.mysql.password = v;
    }
    if let Some(v) = lookup("ADMIN_SECRET_KEY") {
        config.auth.admin_secret_key = v;
    }
    if let Some(v) = lookup("LOGGER_LEVEL") {
        config.observability.log_level = v.to_lowercase();
    }

    parse_override(&lookup, "MYSQL_PORT", &mut config.mysql.port, &mut errors);
    parse_override(&lookup, "MYSQL_POOL_MIN", &mut config.mysql.pool_min, &mut errors);
    parse_override(&lookup, "MYSQL_POOL_MAX", &mut config.mysql.pool_max, &mut errors);
    parse_override(&lookup, "MAX_TRY_LOGIN_TIME", &mut config.auth.max_login_attempts, &mut errors);
    parse_override(&lookup, "WINDOW_SECONDS", &mut config.auth.window_seconds, &mut errors);

    errors
}

fn parse_override<F, T>(lookup: &F, name: &'static str, target: &mut T, errors: &mut Vec<ValidationError>)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(name) {
        match raw.trim().parse() {
            Ok(value) => *target = value,
            Err(_) => errors.push(ValidationError::InvalidOverride { name, value: raw }),
        }
    }
}
