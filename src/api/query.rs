//! Ad-hoc SQL endpoint.

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::http::extract::ApiJson;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::services::{QueryResponse, QueryService};

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub sql: String,
}

/// `POST /api/query`. Statement errors come back with `success: false`.
pub async fn execute(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let response = QueryService::new(&state.pool).execute_query(&body.sql).await?;
    Ok(Json(response))
}
