//! Service-layer errors and MySQL error-number mapping.

use thiserror::Error;

use crate::db::error::{mysql_error_message, mysql_error_number};
use crate::db::PoolError;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request is malformed or violates a constraint.
    #[error("{0}")]
    InvalidInput(String),

    /// The named database, table or row does not exist.
    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Pool(#[from] PoolError),

    /// Any other server or driver failure.
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),
}

/// What a failing statement was operating on, for error messages.
#[derive(Debug, Clone, Copy)]
pub struct Target<'a> {
    pub database: &'a str,
    pub table: Option<&'a str>,
}

impl<'a> Target<'a> {
    pub fn database(database: &'a str) -> Self {
        Self { database, table: None }
    }

    pub fn table(database: &'a str, table: &'a str) -> Self {
        Self {
            database,
            table: Some(table),
        }
    }
}

impl ServiceError {
    /// Map a driver error to a service error by its server error number.
    pub fn from_sqlx(err: sqlx::Error, target: Target<'_>) -> Self {
        let Some(number) = mysql_error_number(&err) else {
            return ServiceError::Database(err);
        };
        let message = mysql_error_message(&err);
        let db = target.database;
        let table = target.table.unwrap_or_default();

        match number {
            1007 => ServiceError::InvalidInput(format!("Database '{db}' already exists")),
            1008 | 1049 => ServiceError::NotFound(format!("Database '{db}' does not exist")),
            1051 | 1146 => {
                ServiceError::NotFound(format!("Table '{table}' does not exist in database '{db}'"))
            }
            1054 => ServiceError::InvalidInput(format!("Unknown column in table '{table}': {message}")),
            1048 | 1062 | 1264 | 1364 | 1406 | 1452 => {
                ServiceError::InvalidInput(format!("Data validation failed: {message}"))
            }
            1451 => ServiceError::InvalidInput(format!(
                "Cannot delete row: foreign key constraint violation: {message}"
            )),
            1064 => ServiceError::InvalidInput(format!("Invalid filter syntax: {message}")),
            _ => ServiceError::Database(err),
        }
    }
}
