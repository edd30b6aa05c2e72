//! HTTP surface: intake, job triggers, unsubscribe, enrichment, registry.

use axum::http::StatusCode;
use digest_core::{RequirementStatus, UnsubscribeKind};
use integration_tests::fixtures::{requirement_input, status_change, status_change_event};
use integration_tests::setup::{unconfigured_router, TestContext, CRON_SECRET};
use axum_test::TestServer;
use store::QueueStore;

#[tokio::test]
async fn test_status_change_is_queued() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .post("/notifications/status-change")
        .json(&status_change_event("user-a", "req-1"))
        .await;

    response.assert_status(StatusCode::ACCEPTED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["queued"], true);
    assert!(body["id"].is_string());
    assert_eq!(ctx.store.pending_count(), 1);
}

#[tokio::test]
async fn test_invalid_status_change_rejected() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let mut event = status_change_event("user-a", "req-1");
    event.email = "not-an-email".into();

    let response = server.post("/notifications/status-change").json(&event).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_001");
    assert_eq!(ctx.store.pending_count(), 0);
}

#[tokio::test]
async fn test_enqueue_failure_does_not_fail_caller() {
    let ctx = TestContext::new();
    ctx.store.set_fail_writes(true);
    let server = ctx.server();

    let response = server
        .post("/notifications/status-change")
        .json(&status_change_event("user-a", "req-1"))
        .await;

    response.assert_status(StatusCode::ACCEPTED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["queued"], false);
}

#[tokio::test]
async fn test_digest_job_requires_cron_secret() {
    let ctx = TestContext::with_cron_secret();
    ctx.store
        .enqueue(status_change("user-a", "co-1", "x", RequirementStatus::Pending, RequirementStatus::Completed))
        .await
        .unwrap();
    let server = ctx.server();

    let denied = server.post("/jobs/digest-flush").await;
    denied.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(ctx.mailer.sent_count(), 0);

    let wrong = server
        .post("/jobs/digest-flush")
        .add_header("x-cron-secret", "nope")
        .await;
    wrong.assert_status(StatusCode::UNAUTHORIZED);

    let allowed = server
        .post("/jobs/digest-flush")
        .add_header("x-cron-secret", CRON_SECRET)
        .await;
    allowed.assert_status_ok();
    let body: serde_json::Value = allowed.json();
    assert_eq!(body["sent"], 1);
    assert_eq!(ctx.mailer.sent_count(), 1);
}

#[tokio::test]
async fn test_reminder_job_accepts_date_override() {
    let ctx = TestContext::new();
    ctx.store.add_requirement(integration_tests::fixtures::requirement("r1", "co-1", 7));
    ctx.store.add_user(integration_tests::fixtures::admin("admin-1", "co-1"));
    let server = ctx.server();

    let response = server
        .post("/jobs/reminders")
        .add_query_param("date", integration_tests::fixtures::today().to_string())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["sent"], 1);
}

#[tokio::test]
async fn test_jobs_unavailable_without_mailer() {
    let server = TestServer::new(unconfigured_router()).unwrap();

    let response = server.post("/jobs/digest-flush").await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "CONFIG_001");
}

#[tokio::test]
async fn test_unsubscribe_get_only_confirms() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let token = ctx.token("user-a", UnsubscribeKind::Reminders);

    let response = server.get("/unsubscribe").add_query_param("token", &token).await;

    response.assert_status_ok();
    assert!(response.text().contains("method=\"post\""));
    assert!(ctx.store.preference("user-a").is_none());
}

#[tokio::test]
async fn test_unsubscribe_post_updates_preference() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let token = ctx.token("user-a", UnsubscribeKind::Reminders);

    let response = server.post("/unsubscribe").add_query_param("token", &token).await;

    response.assert_status_ok();
    let pref = ctx.store.preference("user-a").expect("preference stored");
    assert!(pref.unsubscribe_reminders);
    assert!(!pref.unsubscribe_all);
    assert!(!pref.unsubscribe_status_changes);
}

#[tokio::test]
async fn test_tampered_token_rejected() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let mut token = ctx.token("user-a", UnsubscribeKind::All);
    let last = token.pop().unwrap();
    token.push(if last == 'A' { 'B' } else { 'A' });

    let response = server.post("/unsubscribe").add_query_param("token", &token).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(ctx.store.preference("user-a").is_none());
}

#[tokio::test]
async fn test_unsubscribe_is_rate_limited_per_client() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let mut limited = None;
    for _ in 0..20 {
        let response = server
            .get("/unsubscribe")
            .add_header("x-forwarded-for", "203.0.113.9")
            .add_query_param("token", "garbage")
            .await;
        if response.status_code() == StatusCode::TOO_MANY_REQUESTS {
            limited = Some(response);
            break;
        }
    }

    let response = limited.expect("rate limit never triggered");
    assert!(response.headers().contains_key("retry-after"));
}

#[tokio::test]
async fn test_enrichment_endpoint_returns_one_annotation_per_item() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let items = vec![
        requirement_input("r1", "Hold board meeting every quarter"),
        requirement_input("r2", "File DIR-3 KYC for every director"),
    ];

    let response = server
        .post("/enrichment")
        .json(&serde_json::json!({ "requirements": items, "options": { "maxSearches": 1 } }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let annotations = body["annotations"].as_array().unwrap();
    assert_eq!(annotations.len(), 2);
    assert_eq!(annotations[0]["requirementId"], "r1");
    assert_eq!(annotations[1]["requirementId"], "r2");
    assert_eq!(ctx.search.call_count(), 1);
}

#[tokio::test]
async fn test_enrichment_options_cannot_exceed_configured_limits() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let items: Vec<_> = (0..30)
        .map(|i| requirement_input(&format!("r{}", i), &format!("Maintain register number {}", i)))
        .collect();

    let response = server
        .post("/enrichment")
        .json(&serde_json::json!({
            "requirements": items,
            "options": { "maxSearches": 100000, "concurrency": 100000 }
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["annotations"].as_array().unwrap().len(), 30);
    // configured cap of 25 searches, folded into batches of 10
    assert_eq!(ctx.search.call_count(), 25);
    assert_eq!(ctx.llm.call_count(), 3);
}

#[tokio::test]
async fn test_enrichment_rejects_out_of_range_cache_ttl() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .post("/enrichment")
        .json(&serde_json::json!({
            "requirements": [requirement_input("r1", "Hold board meeting every quarter")],
            "options": { "cacheTtlDays": i64::MAX }
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(ctx.search.call_count(), 0);
}

#[tokio::test]
async fn test_enrichment_unavailable_without_providers() {
    let server = TestServer::new(unconfigured_router()).unwrap();

    let response = server
        .post("/enrichment")
        .json(&serde_json::json!({ "requirements": [] }))
        .await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_registry_unavailable_without_credentials() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server.get("/registry/companies/U72900KA2015PTC082988").await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
}
