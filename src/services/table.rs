//! Table-level operations and paged data browsing.

use serde::Serialize;
use sqlx::mysql::MySqlConnection;
use sqlx::Executor;

use crate::db::rows::{row_to_json, text, JsonRow};
use crate::db::MySqlPoolManager;
use crate::services::error::{ServiceError, Target};
use crate::services::identifier::{quote, validate_filter, validate_identifier};
use crate::services::settle;

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 1000;

/// One column as reported by `SHOW COLUMNS`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: bool,
    pub key: String,
    pub default: Option<String>,
    pub extra: String,
}

/// One page of table rows.
#[derive(Debug, Clone, Serialize)]
pub struct TableData {
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<JsonRow>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

/// Paging and filter parameters for [`TableService::table_data`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub filter: Option<String>,
    pub page: u32,
    pub page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            filter: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    fn validate(&self) -> Result<(), ServiceError> {
        if self.page < 1 {
            return Err(ServiceError::InvalidInput("page must be at least 1".to_string()));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(ServiceError::InvalidInput(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        if let Some(filter) = self.active_filter() {
            validate_filter(filter)?;
        }
        Ok(())
    }

    fn active_filter(&self) -> Option<&str> {
        self.filter.as_deref().map(str::trim).filter(|f| !f.is_empty())
    }

    fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }
}

pub fn total_pages(total: u64, page_size: u32) -> u64 {
    total.div_ceil(u64::from(page_size))
}

pub struct TableService<'a> {
    pool: &'a MySqlPoolManager,
}

impl<'a> TableService<'a> {
    pub fn new(pool: &'a MySqlPoolManager) -> Self {
        Self { pool }
    }

    pub async fn list_tables(&self, database: &str) -> Result<Vec<String>, ServiceError> {
        validate_identifier(database, "Database name")?;

        let sql = format!("SHOW TABLES FROM {}", quote(database));
        let mut conn = self.pool.acquire().await?;
        let result = (&mut *conn).fetch_all(sql.as_str()).await;
        settle(self.pool, conn, &result);

        let rows = result.map_err(|e| {
            tracing::error!(db = database, error = %e, "Failed to list tables");
            ServiceError::from_sqlx(e, Target::database(database))
        })?;
        let tables: Vec<String> = rows.iter().filter_map(|row| text(row, 0)).collect();
        tracing::info!(db = database, count = tables.len(), "Listed tables");
        Ok(tables)
    }

    pub async fn drop_table(&self, database: &str, table: &str) -> Result<(), ServiceError> {
        validate_identifier(database, "Database name")?;
        validate_identifier(table, "Table name")?;

        let sql = format!("DROP TABLE {}.{}", quote(database), quote(table));
        let mut conn = self.pool.acquire().await?;
        let result = (&mut *conn).execute(sql.as_str()).await;
        settle(self.pool, conn, &result);

        result.map_err(|e| {
            tracing::error!(db = database, table, error = %e, "Failed to drop table");
            ServiceError::from_sqlx(e, Target::table(database, table))
        })?;
        tracing::info!(db = database, table, "Dropped table");
        Ok(())
    }

    pub async fn table_structure(&self, database: &str, table: &str) -> Result<Vec<ColumnInfo>, ServiceError> {
        validate_identifier(database, "Database name")?;
        validate_identifier(table, "Table name")?;

        let mut conn = self.pool.acquire().await?;
        let result = fetch_columns(&mut conn, database, table).await;
        settle(self.pool, conn, &result);

        let columns = result.map_err(|e| {
            tracing::error!(db = database, table, error = %e, "Failed to get table structure");
            ServiceError::from_sqlx(e, Target::table(database, table))
        })?;
        if columns.is_empty() {
            return Err(table_missing(database, table));
        }
        tracing::info!(db = database, table, "Retrieved table structure");
        Ok(columns)
    }

    /// One page of rows, optionally filtered by a `WHERE` condition.
    pub async fn table_data(
        &self,
        database: &str,
        table: &str,
        request: &PageRequest,
    ) -> Result<TableData, ServiceError> {
        validate_identifier(database, "Database name")?;
        validate_identifier(table, "Table name")?;
        request.validate()?;

        let mut conn = self.pool.acquire().await?;
        let result = fetch_page(&mut conn, database, table, request).await;
        settle(self.pool, conn, &result);

        let (columns, total, rows) = result.map_err(|e| {
            tracing::error!(db = database, table, error = %e, "Failed to get table data");
            ServiceError::from_sqlx(e, Target::table(database, table))
        })?;
        if columns.is_empty() {
            return Err(table_missing(database, table));
        }

        let total_pages = total_pages(total, request.page_size);
        tracing::info!(
            db = database,
            table,
            rows = rows.len(),
            page = request.page,
            total_pages,
            filter = request.active_filter().unwrap_or_default(),
            "Retrieved table data"
        );

        Ok(TableData {
            columns,
            rows,
            total,
            page: request.page,
            page_size: request.page_size,
            total_pages,
        })
    }
}

fn table_missing(database: &str, table: &str) -> ServiceError {
    ServiceError::NotFound(format!("Table '{table}' does not exist in database '{database}'"))
}

async fn fetch_columns(
    conn: &mut MySqlConnection,
    database: &str,
    table: &str,
) -> Result<Vec<ColumnInfo>, sqlx::Error> {
    let sql = format!("SHOW COLUMNS FROM {}.{}", quote(database), quote(table));
    let rows = (&mut *conn).fetch_all(sql.as_str()).await?;

    Ok(rows
        .iter()
        .map(|row| ColumnInfo {
            name: text(row, 0).unwrap_or_default(),
            data_type: text(row, 1).unwrap_or_default(),
            nullable: text(row, 2).as_deref() == Some("YES"),
            key: text(row, 3).unwrap_or_default(),
            default: text(row, 4),
            extra: text(row, 5).unwrap_or_default(),
        })
        .collect())
}

async fn fetch_page(
    conn: &mut MySqlConnection,
    database: &str,
    table: &str,
    request: &PageRequest,
) -> Result<(Vec<ColumnInfo>, u64, Vec<JsonRow>), sqlx::Error> {
    let columns = fetch_columns(conn, database, table).await?;
    if columns.is_empty() {
        return Ok((columns, 0, Vec::new()));
    }

    let source = format!("{}.{}", quote(database), quote(table));
    let condition = request
        .active_filter()
        .map(|f| format!(" WHERE {f}"))
        .unwrap_or_default();

    let count_sql = format!("SELECT COUNT(*) FROM {source}{condition}");
    let total = (&mut *conn)
        .fetch_one(count_sql.as_str())
        .await
        .map(|row| text(&row, 0).and_then(|t| t.parse::<u64>().ok()).unwrap_or(0))?;

    let select_sql = format!(
        "SELECT * FROM {source}{condition} LIMIT {} OFFSET {}",
        request.page_size,
        request.offset()
    );
    let rows = (&mut *conn).fetch_all(select_sql.as_str()).await?;

    Ok((columns, total, rows.iter().map(row_to_json).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0, 50), 0);
        assert_eq!(total_pages(1, 50), 1);
        assert_eq!(total_pages(100, 50), 2);
        assert_eq!(total_pages(101, 50), 3);
    }

    #[test]
    fn page_bounds_are_enforced() {
        let mut request = PageRequest::default();
        assert!(request.validate().is_ok());
        assert_eq!(request.offset(), 0);

        request.page = 3;
        request.page_size = 20;
        assert_eq!(request.offset(), 40);

        request.page_size = MAX_PAGE_SIZE + 1;
        assert!(request.validate().is_err());

        request.page_size = 10;
        request.page = 0;
        assert!(request.validate().is_err());
    }

    #[test]
    fn blank_filter_is_ignored() {
        let request = PageRequest {
            filter: Some("   ".into()),
            ..PageRequest::default()
        };
        assert_eq!(request.active_filter(), None);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn filter_is_checked_before_any_query() {
        let request = PageRequest {
            filter: Some("1=1; DROP TABLE users".into()),
            ..PageRequest::default()
        };
        assert!(matches!(request.validate(), Err(ServiceError::InvalidInput(_))));
    }

    #[test]
    fn column_info_serializes_type_field() {
        let column = ColumnInfo {
            name: "id".into(),
            data_type: "int".into(),
            nullable: false,
            key: "PRI".into(),
            default: None,
            extra: "auto_increment".into(),
        };
        let json = serde_json::to_value(&column).unwrap();
        assert_eq!(json["type"], "int");
        assert!(json["default"].is_null());
    }
}
