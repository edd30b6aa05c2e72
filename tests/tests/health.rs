//! Tests for health check endpoints.

use axum::http::StatusCode;
use integration_tests::setup::TestContext;

#[tokio::test]
async fn test_health_endpoint_structure() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    let status = body["status"].as_str().unwrap_or("");
    assert!(
        status == "healthy" || status == "degraded",
        "database is up, got '{}'",
        status
    );

    let components = body["components"].as_array().expect("components array");
    let names: Vec<&str> = components.iter().filter_map(|c| c["name"].as_str()).collect();
    assert_eq!(names, vec!["database", "mailer", "search", "llm"]);
    assert!(body["metrics"]["digests_sent"].is_u64());
}

#[tokio::test]
async fn test_ready_endpoint() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server.get("/health/ready").await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_live_endpoint() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server.get("/health/live").await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server.get("/events").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}
