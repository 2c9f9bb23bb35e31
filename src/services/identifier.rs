//! Identifier and filter validation.
//!
//! Identifiers are the only user input spliced into SQL text. They are
//! validated here and then backtick-quoted.

use crate::services::error::ServiceError;

pub const MAX_IDENTIFIER_LEN: usize = 64;

pub const SYSTEM_DATABASES: [&str; 4] = ["information_schema", "mysql", "performance_schema", "sys"];

/// Keywords rejected in filter conditions when they appear as whole words.
const FORBIDDEN_KEYWORDS: [&str; 13] = [
    "DROP",
    "DELETE",
    "INSERT",
    "UPDATE",
    "CREATE",
    "ALTER",
    "TRUNCATE",
    "EXEC",
    "EXECUTE",
    "UNION",
    "INFORMATION_SCHEMA",
    "MYSQL",
    "PERFORMANCE_SCHEMA",
];

/// Tokens rejected anywhere in a filter condition.
const FORBIDDEN_TOKENS: [&str; 4] = ["--", "/*", "*/", ";"];

/// Check `name` against `[A-Za-z0-9_]{1,64}`.
pub fn validate_identifier(name: &str, kind: &str) -> Result<(), ServiceError> {
    if name.is_empty() {
        return Err(ServiceError::InvalidInput(format!("{kind} cannot be empty")));
    }
    let well_formed = name.len() <= MAX_IDENTIFIER_LEN
        && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_');
    if !well_formed {
        return Err(ServiceError::InvalidInput(format!(
            "{kind} must contain only alphanumeric characters and underscores, \
             and be between 1 and {MAX_IDENTIFIER_LEN} characters long"
        )));
    }
    Ok(())
}

pub fn is_system_database(name: &str) -> bool {
    SYSTEM_DATABASES.iter().any(|sys| sys.eq_ignore_ascii_case(name))
}

/// Validate a database name that is about to be created or dropped.
pub fn validate_user_database(name: &str) -> Result<(), ServiceError> {
    validate_identifier(name, "Database name")?;
    if is_system_database(name) {
        return Err(ServiceError::InvalidInput(format!(
            "Cannot modify system database: {name}"
        )));
    }
    Ok(())
}

/// Backtick-quote a validated identifier.
pub fn quote(name: &str) -> String {
    format!("`{name}`")
}

/// Reject filter conditions containing statement-level keywords or
/// comment/terminator tokens. Everything else is left to the server's parser.
pub fn validate_filter(filter: &str) -> Result<(), ServiceError> {
    let upper = filter.to_ascii_uppercase();

    if let Some(token) = FORBIDDEN_TOKENS.iter().find(|t| upper.contains(*t)) {
        return Err(forbidden(token));
    }

    let words = upper.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'));
    for word in words {
        if let Some(keyword) = FORBIDDEN_KEYWORDS.iter().find(|k| **k == word) {
            return Err(forbidden(keyword));
        }
    }
    Ok(())
}

fn forbidden(keyword: &str) -> ServiceError {
    ServiceError::InvalidInput(format!(
        "Invalid filter condition: contains forbidden keyword '{keyword}'"
    ))
}
