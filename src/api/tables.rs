//! Table endpoints.

use axum::{
    extract::State,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::MessageResponse;
use crate::http::extract::{ApiPath, ApiQuery};
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::services::table::{PageRequest, DEFAULT_PAGE_SIZE};
use crate::services::{ColumnInfo, TableData, TableService};

#[derive(Debug, Serialize)]
pub struct TableList {
    pub tables: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct TableStructure {
    pub columns: Vec<ColumnInfo>,
}

#[derive(Debug, Deserialize)]
pub struct DataQuery {
    pub filter: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl From<DataQuery> for PageRequest {
    fn from(query: DataQuery) -> Self {
        Self {
            filter: query.filter,
            page: query.page.unwrap_or(1),
            page_size: query.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        }
    }
}

pub async fn list(State(state): State<AppState>, ApiPath(db): ApiPath<String>) -> Result<Json<TableList>, ApiError> {
    let tables = TableService::new(&state.pool).list_tables(&db).await?;
    Ok(Json(TableList { tables }))
}

pub async fn drop(
    State(state): State<AppState>,
    ApiPath((db, table)): ApiPath<(String, String)>,
) -> Result<Json<MessageResponse>, ApiError> {
    TableService::new(&state.pool).drop_table(&db, &table).await?;
    Ok(Json(MessageResponse::ok(format!(
        "Table '{table}' deleted successfully from database '{db}'"
    ))))
}

pub async fn data(
    State(state): State<AppState>,
    ApiPath((db, table)): ApiPath<(String, String)>,
    ApiQuery(query): ApiQuery<DataQuery>,
) -> Result<Json<TableData>, ApiError> {
    let request = PageRequest::from(query);
    let data = TableService::new(&state.pool).table_data(&db, &table, &request).await?;
    Ok(Json(data))
}

pub async fn structure(
    State(state): State<AppState>,
    ApiPath((db, table)): ApiPath<(String, String)>,
) -> Result<Json<TableStructure>, ApiError> {
    let columns = TableService::new(&state.pool).table_structure(&db, &table).await?;
    Ok(Json(TableStructure { columns }))
}
