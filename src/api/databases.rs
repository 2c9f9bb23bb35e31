//! Database endpoints.

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::MessageResponse;
use crate::http::extract::{ApiJson, ApiPath};
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::services::DatabaseService;

#[derive(Debug, Serialize)]
pub struct DatabaseList {
    pub databases: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateDatabase {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct DatabaseDdl {
    pub ddl: String,
}

pub async fn list(State(state): State<AppState>) -> Result<Json<DatabaseList>, ApiError> {
    let databases = DatabaseService::new(&state.pool).list_databases().await?;
    Ok(Json(DatabaseList { databases }))
}

pub async fn create(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateDatabase>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let name = body.name.trim();
    DatabaseService::new(&state.pool).create_database(name).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::ok(format!("Database '{name}' created successfully"))),
    ))
}

pub async fn drop(
    State(state): State<AppState>,
    ApiPath(name): ApiPath<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    DatabaseService::new(&state.pool).drop_database(&name).await?;
    Ok(Json(MessageResponse::ok(format!("Database '{name}' deleted successfully"))))
}

pub async fn ddl(
    State(state): State<AppState>,
    ApiPath(name): ApiPath<String>,
) -> Result<Json<DatabaseDdl>, ApiError> {
    let ddl = DatabaseService::new(&state.pool).database_ddl(&name).await?;
    Ok(Json(DatabaseDdl { ddl }))
}
