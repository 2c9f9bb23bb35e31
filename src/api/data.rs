//! Row endpoints.

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::api::MessageResponse;
use crate::db::rows::JsonRow;
use crate::http::extract::{ApiJson, ApiPath};
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::services::DataService;

#[derive(Debug, Deserialize)]
pub struct RowInsert {
    pub data: JsonRow,
}

#[derive(Debug, Deserialize)]
pub struct RowUpdate {
    pub pk_column: String,
    pub pk_value: Value,
    pub data: JsonRow,
}

#[derive(Debug, Deserialize)]
pub struct RowDelete {
    pub pk_column: String,
    pub pk_value: Value,
}

pub async fn insert(
    State(state): State<AppState>,
    ApiPath((db, table)): ApiPath<(String, String)>,
    ApiJson(body): ApiJson<RowInsert>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    DataService::new(&state.pool).insert_row(&db, &table, &body.data).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::ok(format!("Row inserted successfully into table '{db}.{table}'"))),
    ))
}

pub async fn update(
    State(state): State<AppState>,
    ApiPath((db, table)): ApiPath<(String, String)>,
    ApiJson(body): ApiJson<RowUpdate>,
) -> Result<Json<MessageResponse>, ApiError> {
    DataService::new(&state.pool)
        .update_row(&db, &table, &body.pk_column, &body.pk_value, &body.data)
        .await?;
    Ok(Json(MessageResponse::ok(format!("Row updated successfully in table '{db}.{table}'"))))
}

pub async fn remove(
    State(state): State<AppState>,
    ApiPath((db, table)): ApiPath<(String, String)>,
    ApiJson(body): ApiJson<RowDelete>,
) -> Result<Json<MessageResponse>, ApiError> {
    DataService::new(&state.pool)
        .delete_row(&db, &table, &body.pk_column, &body.pk_value)
        .await?;
    Ok(Json(MessageResponse::ok(format!("Row deleted successfully from table '{db}.{table}'"))))
}
