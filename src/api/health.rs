//! Service info and health.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::db::PoolStatus;
use crate::http::server::AppState;

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: &'static str,
    pub env: String,
    pub status: &'static str,
}

/// `GET /api`
pub async fn info(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: state.config.server.name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        env: state.config.server.env.clone(),
        status: "running",
    })
}

#[derive(Debug, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub database_connected: bool,
    pub message: String,
    pub pool: PoolStatus,
}

/// `GET /api/health`
pub async fn health(State(state): State<AppState>) -> Json<HealthCheck> {
    let connected = state.pool.test_connection().await;
    let (status, message) = if connected {
        ("healthy", "Database connection is active")
    } else {
        ("unhealthy", "Database connection failed")
    };

    Json(HealthCheck {
        status,
        database_connected: connected,
        message: message.to_string(),
        pool: state.pool.status(),
    })
}
