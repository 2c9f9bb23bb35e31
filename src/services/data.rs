//! Row-level insert, update and delete.
//!
//! Column names are validated identifiers; every value is a bound parameter.

use serde_json::Value;

use crate::db::rows::{bind_json, display_value, JsonRow};
use crate::db::MySqlPoolManager;
use crate::services::error::{ServiceError, Target};
use crate::services::identifier::{quote, validate_identifier};
use crate::services::settle;

pub struct DataService<'a> {
    pool: &'a MySqlPoolManager,
}

impl<'a> DataService<'a> {
    pub fn new(pool: &'a MySqlPoolManager) -> Self {
        Self { pool }
    }

    /// Insert one row. Returns the number of affected rows.
    pub async fn insert_row(&self, database: &str, table: &str, data: &JsonRow) -> Result<u64, ServiceError> {
        validate_target(database, table)?;
        validate_data(data)?;

        let columns: Vec<String> = data.keys().map(|c| quote(c)).collect();
        let placeholders = vec!["?"; data.len()].join(", ");
        let sql = format!(
            "INSERT INTO {}.{} ({}) VALUES ({placeholders})",
            quote(database),
            quote(table),
            columns.join(", ")
        );

        let query = data.values().fold(sqlx::query(&sql), |q, v| bind_json(q, v));
        let mut conn = self.pool.acquire().await?;
        let result = query.execute(&mut *conn).await;
        settle(self.pool, conn, &result);

        let done = result.map_err(|e| {
            tracing::error!(db = database, table, error = %e, "Failed to insert row");
            ServiceError::from_sqlx(e, Target::table(database, table))
        })?;
        tracing::info!(db = database, table, "Inserted row");
        Ok(done.rows_affected())
    }

    /// Update the row whose `pk_column` equals `pk_value`.
    pub async fn update_row(
        &self,
        database: &str,
        table: &str,
        pk_column: &str,
        pk_value: &Value,
        data: &JsonRow,
    ) -> Result<u64, ServiceError> {
        validate_target(database, table)?;
        validate_identifier(pk_column, "Primary key column")?;
        validate_data(data)?;

        let assignments: Vec<String> = data.keys().map(|c| format!("{} = ?", quote(c))).collect();
        let sql = format!(
            "UPDATE {}.{} SET {} WHERE {} = ?",
            quote(database),
            quote(table),
            assignments.join(", "),
            quote(pk_column)
        );

        let query = data.values().fold(sqlx::query(&sql), |q, v| bind_json(q, v));
        let query = bind_json(query, pk_value);
        let mut conn = self.pool.acquire().await?;
        let result = query.execute(&mut *conn).await;
        settle(self.pool, conn, &result);

        let affected = result
            .map_err(|e| {
                tracing::error!(db = database, table, error = %e, "Failed to update row");
                ServiceError::from_sqlx(e, Target::table(database, table))
            })?
            .rows_affected();

        let key = display_value(pk_value);
        if affected == 0 {
            tracing::warn!(db = database, table, pk_column, pk_value = %key, "No rows updated");
        } else {
            tracing::info!(db = database, table, pk_column, pk_value = %key, affected, "Updated row(s)");
        }
        Ok(affected)
    }

    /// Delete the row whose `pk_column` equals `pk_value`.
    pub async fn delete_row(
        &self,
        database: &str,
        table: &str,
        pk_column: &str,
        pk_value: &Value,
    ) -> Result<u64, ServiceError> {
        validate_target(database, table)?;
        validate_identifier(pk_column, "Primary key column")?;

        let sql = format!(
            "DELETE FROM {}.{} WHERE {} = ?",
            quote(database),
            quote(table),
            quote(pk_column)
        );

        let query = bind_json(sqlx::query(&sql), pk_value);
        let mut conn = self.pool.acquire().await?;
        let result = query.execute(&mut *conn).await;
        settle(self.pool, conn, &result);

        let affected = result
            .map_err(|e| {
                tracing::error!(db = database, table, error = %e, "Failed to delete row");
                ServiceError::from_sqlx(e, Target::table(database, table))
            })?
            .rows_affected();

        let key = display_value(pk_value);
        if affected == 0 {
            tracing::warn!(db = database, table, pk_column, pk_value = %key, "No rows deleted");
        } else {
            tracing::info!(db = database, table, pk_column, pk_value = %key, affected, "Deleted row(s)");
        }
        Ok(affected)
    }
}

fn validate_target(database: &str, table: &str) -> Result<(), ServiceError> {
    validate_identifier(database, "Database name")?;
    validate_identifier(table, "Table name")
}

fn validate_data(data: &JsonRow) -> Result<(), ServiceError> {
    if data.is_empty() {
        return Err(ServiceError::InvalidInput("Data cannot be empty".to_string()));
    }
    data.keys().try_for_each(|column| validate_identifier(column, "Column name"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_data_is_rejected() {
        let err = validate_data(&JsonRow::new()).unwrap_err();
        assert_eq!(err.to_string(), "Data cannot be empty");
    }

    #[test]
    fn column_names_are_identifiers() {
        let Value::Object(good) = json!({"name": "a", "qty_2": 3}) else { unreachable!() };
        assert!(validate_data(&good).is_ok());

        let Value::Object(bad) = json!({"name) VALUES (1); --": "x"}) else { unreachable!() };
        assert!(matches!(validate_data(&bad), Err(ServiceError::InvalidInput(_))));
    }
}
