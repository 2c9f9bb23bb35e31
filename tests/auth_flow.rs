//! HTTP-level tests for login rate limiting and admin key protection.
//!
//! The pool is never initialized, so every route that needs the database
//! answers 503 while validation and auth still run.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{json, Value};

use mysql_admin::config::watcher::apply_reload;

mod common;

use common::{client, start_admin_server, test_config, ADMIN_KEY};

async fn login(server: &common::TestServer, ip: &str, key: &str) -> reqwest::Response {
    client()
        .post(server.url("/api/auth/verify"))
        .header("X-Forwarded-For", ip)
        .json(&json!({ "secret_key": key }))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn wrong_keys_count_down_then_block() {
    let server = start_admin_server(test_config()).await;
    let ip = "198.51.100.10";

    let res = login(&server, ip, "nope").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert!(body["detail"].as_str().unwrap().contains("2 attempt(s) remaining"));

    let res = login(&server, ip, "nope").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert!(body["detail"].as_str().unwrap().contains("1 attempt(s) remaining"));

    // Third failure exhausts the budget.
    let res = login(&server, ip, "nope").await;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(res.headers()["retry-after"], "60");

    // Even the right key is refused while blocked.
    let res = login(&server, ip, ADMIN_KEY).await;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry: u64 = res.headers()["retry-after"].to_str().unwrap().parse().unwrap();
    assert!((1..=60).contains(&retry));

    // Other clients are unaffected.
    let res = login(&server, "198.51.100.11", ADMIN_KEY).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn successful_login_resets_attempts() {
    let server = start_admin_server(test_config()).await;
    let ip = "198.51.100.20";
    let window = Duration::from_secs(60);

    login(&server, ip, "nope").await;
    login(&server, ip, "nope").await;
    assert_eq!(server.state.limiter.get_attempts(ip, window), 2);

    let res = login(&server, ip, ADMIN_KEY).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(server.state.limiter.get_attempts(ip, window), 0);
}

#[tokio::test]
async fn login_attempts_are_audited() {
    let server = start_admin_server(test_config()).await;
    login(&server, "203.0.113.1", "nope").await;
    login(&server, "203.0.113.2", ADMIN_KEY).await;

    let res = client()
        .get(server.url("/api/auth/logs?limit=10"))
        .header("X-Admin-Key", ADMIN_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await.unwrap();
    let logs = body["logs"].as_array().unwrap();
    assert_eq!(logs.len(), 2);
    assert!(logs[0].as_str().unwrap().ends_with("203.0.113.2   success"));
    assert!(logs[1].as_str().unwrap().ends_with("203.0.113.1   failed"));
    assert_eq!(body["failed_last_24h"], 1);
}

#[tokio::test]
async fn protected_routes_require_admin_key() {
    let server = start_admin_server(test_config()).await;

    let res = client().get(server.url("/api/databases")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.headers()["www-authenticate"], "AdminKey");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["detail"], "Admin key is required");

    let res = client()
        .get(server.url("/api/databases"))
        .header("X-Admin-Key", "wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["detail"], "Invalid admin key");
}

#[tokio::test]
async fn uninitialized_pool_is_unavailable() {
    let server = start_admin_server(test_config()).await;

    let res = client()
        .get(server.url("/api/databases"))
        .header("X-Admin-Key", ADMIN_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Service unavailable");

    let res = client()
        .get(server.url("/api/health"))
        .header("X-Admin-Key", ADMIN_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["database_connected"], false);
    assert_eq!(body["pool"]["state"], "uninitialized");
}

#[tokio::test]
async fn input_is_validated_before_touching_the_pool() {
    let server = start_admin_server(test_config()).await;

    let res = client()
        .post(server.url("/api/query"))
        .header("X-Admin-Key", ADMIN_KEY)
        .json(&json!({ "sql": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client()
        .get(server.url("/api/databases/shop/tables/orders/data"))
        .query(&[("filter", "1=1 UNION SELECT 1")])
        .header("X-Admin-Key", ADMIN_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client()
        .post(server.url("/api/databases"))
        .header("X-Admin-Key", ADMIN_KEY)
        .json(&json!({ "name": "mysql" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["detail"], "Cannot modify system database: mysql");
}

#[tokio::test]
async fn public_routes() {
    let server = start_admin_server(test_config()).await;

    let res = client().get(server.url("/api")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "running");
    assert_eq!(body["name"], "MySQL-Admin API");

    let res = client().get(server.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(res.headers()["location"], "/login.html");
}

#[tokio::test]
async fn reloaded_admin_key_takes_effect() {
    let server = start_admin_server(test_config()).await;

    let mut updated = (*server.state.config).clone();
    updated.auth.admin_secret_key = "rotated-key".to_string();
    assert!(apply_reload(&server.state.auth, &server.state.config, updated));

    let res = client()
        .get(server.url("/api/health"))
        .header("X-Admin-Key", ADMIN_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = login(&server, "192.0.2.50", "rotated-key").await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn malformed_requests_get_json_errors() {
    let server = start_admin_server(test_config()).await;

    let res = client()
        .post(server.url("/api/auth/verify"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(res.headers()["content-type"], "application/json");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Validation error");
    assert!(body["detail"].as_str().unwrap().contains("secret_key"));

    let res = client()
        .get(server.url("/api/databases/shop/tables/orders/data"))
        .query(&[("page", "-1")])
        .header("X-Admin-Key", ADMIN_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Validation error");

    // A malformed body on a public route never counts as a login attempt.
    assert_eq!(server.state.limiter.tracked_keys(), 0);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let mut config = test_config();
    config.server.max_body_size = 1024;
    let server = start_admin_server(config).await;

    let sql = format!("SELECT '{}'", "x".repeat(8 * 1024));
    let res = client()
        .post(server.url("/api/query"))
        .header("X-Admin-Key", ADMIN_KEY)
        .json(&json!({ "sql": sql }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Payload too large");
}
