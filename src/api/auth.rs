//! Login and login audit endpoints.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::http::extract::{ApiJson, ApiQuery};
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::audit::LoginResult;
use crate::observability::metrics;
use crate::security::auth::keys_match;
use crate::security::client_ip::client_ip;

const DEFAULT_LOG_LIMIT: usize = 100;
const MAX_LOG_LIMIT: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub secret_key: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
}

/// `POST /api/auth/verify`
pub async fn verify(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let auth = state.auth.load_full();
    let window = Duration::from_secs(auth.window_seconds);
    let ip = client_ip(&headers, Some(peer));

    let decision = state.limiter.check_rate_limit(&ip, auth.max_login_attempts, window);
    if !decision.allowed {
        tracing::warn!(
            client_ip = %ip,
            attempts = decision.attempts,
            retry_after_secs = decision.retry_after_secs,
            "Login rate limit exceeded"
        );
        metrics::record_rate_limited();
        return Err(too_many_attempts(decision.retry_after_secs));
    }

    if keys_match(&body.secret_key, &auth.admin_secret_key) {
        state.limiter.reset_key(&ip);
        state.login_log.record(&ip, LoginResult::Success).await;
        metrics::record_login(true);
        tracing::info!(client_ip = %ip, "Admin authentication successful");
        return Ok(Json(LoginResponse {
            success: true,
            message: "Authentication successful".to_string(),
        }));
    }

    state.limiter.record_attempt(&ip, 1);
    let used = state.limiter.get_attempts(&ip, window);
    let remaining = auth.max_login_attempts.saturating_sub(used);
    state.login_log.record(&ip, LoginResult::Failed).await;
    metrics::record_login(false);
    tracing::warn!(client_ip = %ip, remaining, "Admin authentication failed: invalid key");

    if remaining > 0 {
        Err(ApiError::Unauthorized(format!(
            "Invalid admin key, {remaining} attempt(s) remaining"
        )))
    } else {
        Err(too_many_attempts(auth.window_seconds))
    }
}

fn too_many_attempts(retry_after_secs: u64) -> ApiError {
    ApiError::RateLimited {
        detail: format!("Too many login attempts, retry in {retry_after_secs} seconds"),
        retry_after_secs,
    }
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub logs: Vec<String>,
    pub count: usize,
    pub failed_last_24h: usize,
}

/// `GET /api/auth/logs`
pub async fn logs(State(state): State<AppState>, ApiQuery(query): ApiQuery<LogsQuery>) -> Json<LogsResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, MAX_LOG_LIMIT);
    let logs = state.login_log.recent(limit).await;
    let failed_last_24h = state.login_log.failed_attempts(None, 24).await;
    Json(LogsResponse {
        count: logs.len(),
        logs,
        failed_last_24h,
    })
}
