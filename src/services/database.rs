//! Database-level operations.

use sqlx::Executor;

use crate::db::rows::text;
use crate::db::MySqlPoolManager;
use crate::services::error::{ServiceError, Target};
use crate::services::identifier::{quote, validate_identifier, validate_user_database};
use crate::services::settle;

pub struct DatabaseService<'a> {
    pool: &'a MySqlPoolManager,
}

impl<'a> DatabaseService<'a> {
    pub fn new(pool: &'a MySqlPoolManager) -> Self {
        Self { pool }
    }

    pub async fn list_databases(&self) -> Result<Vec<String>, ServiceError> {
        let mut conn = self.pool.acquire().await?;
        let result = (&mut *conn).fetch_all("SHOW DATABASES").await;
        settle(self.pool, conn, &result);

        let rows = result.map_err(|e| {
            tracing::error!(error = %e, "Failed to list databases");
            ServiceError::Database(e)
        })?;
        let databases: Vec<String> = rows.iter().filter_map(|row| text(row, 0)).collect();
        tracing::info!(count = databases.len(), "Listed databases");
        Ok(databases)
    }

    pub async fn create_database(&self, name: &str) -> Result<(), ServiceError> {
        validate_user_database(name)?;

        let sql = format!("CREATE DATABASE {}", quote(name));
        let mut conn = self.pool.acquire().await?;
        let result = (&mut *conn).execute(sql.as_str()).await;
        settle(self.pool, conn, &result);

        result.map_err(|e| {
            tracing::error!(db = name, error = %e, "Failed to create database");
            ServiceError::from_sqlx(e, Target::database(name))
        })?;
        tracing::info!(db = name, "Created database");
        Ok(())
    }

    pub async fn drop_database(&self, name: &str) -> Result<(), ServiceError> {
        validate_user_database(name)?;

        let sql = format!("DROP DATABASE {}", quote(name));
        let mut conn = self.pool.acquire().await?;
        let result = (&mut *conn).execute(sql.as_str()).await;
        settle(self.pool, conn, &result);

        result.map_err(|e| {
            tracing::error!(db = name, error = %e, "Failed to drop database");
            ServiceError::from_sqlx(e, Target::database(name))
        })?;
        tracing::info!(db = name, "Dropped database");
        Ok(())
    }

    /// `CREATE` statements for a database and every table in it.
    pub async fn database_ddl(&self, name: &str) -> Result<String, ServiceError> {
        validate_identifier(name, "Database name")?;

        let mut conn = self.pool.acquire().await?;
        let result = collect_ddl(&mut conn, name).await;
        settle(self.pool, conn, &result);

        let ddl = result
            .map_err(|e| {
                tracing::error!(db = name, error = %e, "Failed to get DDL for database");
                ServiceError::from_sqlx(e, Target::database(name))
            })?
            .ok_or_else(|| ServiceError::NotFound(format!("Database '{name}' does not exist")))?;

        tracing::info!(db = name, "Retrieved DDL for database");
        Ok(ddl)
    }
}

/// `Ok(None)` when the database does not exist.
async fn collect_ddl(
    conn: &mut sqlx::MySqlConnection,
    name: &str,
) -> Result<Option<String>, sqlx::Error> {
    let databases = (&mut *conn).fetch_all("SHOW DATABASES").await?;
    if !databases.iter().any(|row| text(row, 0).as_deref() == Some(name)) {
        return Ok(None);
    }

    let db = quote(name);
    let tables = (&mut *conn).fetch_all(format!("SHOW TABLES FROM {db}").as_str()).await?;

    let mut ddl = format!("-- Database: {name}\nCREATE DATABASE IF NOT EXISTS {db};\nUSE {db};\n\n");
    for table in tables.iter().filter_map(|row| text(row, 0)) {
        let sql = format!("SHOW CREATE TABLE {db}.{}", quote(&table));
        if let Some(row) = (&mut *conn).fetch_optional(sql.as_str()).await? {
            if let Some(create) = text(&row, 1) {
                ddl.push_str(&format!("-- Table: {table}\n{create};\n\n"));
            }
        }
    }
    Ok(Some(ddl))
}
