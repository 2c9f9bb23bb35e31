//! Admin key authentication.

use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

use crate::config::AuthConfig;
use crate::http::response::ApiError;

pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Constant-time comparison of a presented key against the secret.
pub fn keys_match(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Reject requests without a valid `X-Admin-Key` header.
pub async fn require_admin_key(
    State(auth): State<Arc<ArcSwap<AuthConfig>>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let provided = request
        .headers()
        .get(ADMIN_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());

    let Some(provided) = provided else {
        tracing::warn!(path = %request.uri().path(), "Admin key missing");
        return Err(ApiError::Unauthorized("Admin key is required".to_string()));
    };

    if !keys_match(provided, &auth.load().admin_secret_key) {
        tracing::warn!(path = %request.uri().path(), "Invalid admin key");
        return Err(ApiError::Unauthorized("Invalid admin key".to_string()));
    }

    Ok(next.run(request).await)
}
