//! Ad-hoc SQL execution.
//!
//! Statement failures are reported in the response body rather than as an
//! error status; only pool failures and empty input are errors.

use std::future::Future;

use serde::Serialize;
use sqlx::{Column, Executor, MySqlConnection};

use crate::db::rows::{column_names, row_to_json, JsonRow};
use crate::db::MySqlPoolManager;
use crate::services::error::ServiceError;
use crate::services::settle;

/// Leading keywords of statements that produce a result set.
const ROW_KEYWORDS: [&str; 6] = ["SELECT", "SHOW", "DESCRIBE", "DESC", "EXPLAIN", "WITH"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Rows,
    Command,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResponse {
    pub success: bool,
    pub columns: Option<Vec<String>>,
    pub rows: Option<Vec<JsonRow>>,
    pub affected_rows: Option<u64>,
    pub error: Option<String>,
}

impl QueryResponse {
    fn failed(message: String) -> Self {
        Self {
            success: false,
            error: Some(message),
            ..Self::default()
        }
    }
}

/// Drop `--` line comments and surrounding whitespace.
pub fn strip_line_comments(sql: &str) -> String {
    sql.lines()
        .map(|line| line.split("--").next().unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Decide whether a statement returns rows, by its first keyword.
pub fn classify(sql: &str) -> StatementKind {
    let stripped = strip_line_comments(sql);
    let first = stripped
        .split(|c: char| c.is_whitespace() || c == '(' || c == ';')
        .find(|token| !token.is_empty())
        .unwrap_or_default();

    if ROW_KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(first)) {
        StatementKind::Rows
    } else {
        StatementKind::Command
    }
}

pub struct QueryService<'a> {
    pool: &'a MySqlPoolManager,
}

impl<'a> QueryService<'a> {
    pub fn new(pool: &'a MySqlPoolManager) -> Self {
        Self { pool }
    }

    pub async fn execute_query(&self, sql: &str) -> Result<QueryResponse, ServiceError> {
        let sql = sql.trim();
        if sql.is_empty() {
            return Err(ServiceError::InvalidInput("SQL statement cannot be empty".to_string()));
        }

        match classify(sql) {
            StatementKind::Rows => self.fetch_rows(sql).await,
            StatementKind::Command => self.run_command(sql).await,
        }
    }

    async fn fetch_rows(&self, sql: &str) -> Result<QueryResponse, ServiceError> {
        let mut conn = self.pool.acquire().await?;
        let result = (&mut *conn).fetch_all(sql).await;
        let columns = match &result {
            Ok(rows) => {
                let from_rows = rows.first().map(column_names);
                Some(columns_or_else(from_rows, || describe_columns(&mut *conn, sql)).await)
            }
            Err(_) => None,
        };
        settle(self.pool, conn, &result);

        match result {
            Ok(rows) => {
                let columns = columns.unwrap_or_default();
                let rows: Vec<JsonRow> = rows.iter().map(row_to_json).collect();
                tracing::info!(rows = rows.len(), "Executed query");
                Ok(QueryResponse {
                    success: true,
                    columns: Some(columns),
                    rows: Some(rows),
                    ..QueryResponse::default()
                })
            }
            Err(e) => Ok(in_band_failure(e, "Query execution failed")),
        }
    }

    async fn run_command(&self, sql: &str) -> Result<QueryResponse, ServiceError> {
        let mut conn = self.pool.acquire().await?;
        let result = (&mut *conn).execute(sql).await;
        settle(self.pool, conn, &result);

        match result {
            Ok(done) => {
                let affected = done.rows_affected();
                tracing::info!(affected, "Executed SQL statement");
                Ok(QueryResponse {
                    success: true,
                    affected_rows: Some(affected),
                    ..QueryResponse::default()
                })
            }
            Err(e) => Ok(in_band_failure(e, "SQL execution failed")),
        }
    }
}

/// Column names of a result set: taken from the first row when there is one,
/// otherwise from the statement metadata. An undescribable statement yields
/// no columns.
async fn columns_or_else<F, Fut>(from_rows: Option<Vec<String>>, describe: F) -> Vec<String>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<String>, sqlx::Error>>,
{
    if let Some(columns) = from_rows {
        return columns;
    }
    match describe().await {
        Ok(columns) => columns,
        Err(e) => {
            tracing::debug!(error = %e, "Could not describe empty result set");
            Vec::new()
        }
    }
}

async fn describe_columns(conn: &mut MySqlConnection, sql: &str) -> Result<Vec<String>, sqlx::Error> {
    let described = conn.describe(sql).await?;
    Ok(described.columns().iter().map(|c| c.name().to_string()).collect())
}

fn in_band_failure(err: sqlx::Error, fallback: &str) -> QueryResponse {
    let message = match err.as_database_error() {
        Some(db) => format!("MySQL error: {}", db.message()),
        None => format!("{fallback}: {err}"),
    };
    tracing::error!(error = %message, "Failed to execute SQL");
    QueryResponse::failed(message)
}
