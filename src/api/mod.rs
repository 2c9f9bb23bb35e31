//! REST API.
//!
//! # Routes
//! ```text
//! public:     GET /, GET /api, POST /api/auth/verify
//! protected:  /api/auth/logs, /api/health, /api/databases/**, /api/query
//!             (X-Admin-Key checked by security::auth)
//! ```

pub mod auth;
pub mod data;
pub mod databases;
pub mod health;
pub mod query;
pub mod tables;

use axum::{
    middleware,
    response::Redirect,
    routing::{get, post},
    Router,
};
use serde::Serialize;

use crate::http::server::AppState;
use crate::security::auth::require_admin_key;

/// `{success, message}` body for mutations.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// All API routes with state applied.
pub fn routes(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/auth/logs", get(auth::logs))
        .route("/api/health", get(health::health))
        .route("/api/databases", get(databases::list).post(databases::create))
        .route("/api/databases/{name}", axum::routing::delete(databases::drop))
        .route("/api/databases/{name}/ddl", get(databases::ddl))
        .route("/api/databases/{db}/tables", get(tables::list))
        .route("/api/databases/{db}/tables/{table}", axum::routing::delete(tables::drop))
        .route("/api/databases/{db}/tables/{table}/data", get(tables::data))
        .route("/api/databases/{db}/tables/{table}/structure", get(tables::structure))
        .route(
            "/api/databases/{db}/tables/{table}/rows",
            post(data::insert).put(data::update).delete(data::remove),
        )
        .route("/api/query", post(query::execute))
        .route_layer(middleware::from_fn_with_state(state.auth.clone(), require_admin_key));

    Router::new()
        .route("/", get(|| async { Redirect::temporary("/login.html") }))
        .route("/api", get(health::info))
        .route("/api/auth/verify", post(auth::verify))
        .merge(protected)
        .with_state(state)
}
