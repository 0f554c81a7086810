//! HTTP API Integration Tests
//!
//! Drives the axum router in-process with `tower::ServiceExt::oneshot`:
//! - JSON envelopes and status codes
//! - the SSE generation endpoint end to end with a scripted provider
//! - sharing and public report access

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use assetworks::models::settings::AppConfig;
use assetworks::{create_router, AppState};
use assetworks_llm::{LlmProvider, LlmResult, ProviderConfig};

use crate::support::{test_db, ScriptedProvider, REPORT_CHUNKS};

// ============================================================================
// Helpers
// ============================================================================

fn app() -> Router {
    let state = AppState::new(test_db(), AppConfig::default()).with_provider_factory(Arc::new(
        |_config: ProviderConfig| -> LlmResult<Arc<dyn LlmProvider>> {
            Ok(ScriptedProvider::new(REPORT_CHUNKS).shared())
        },
    ));
    create_router(state)
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

async fn call_json(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, bytes) = call(app, method, uri, body).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Parse the JSON payloads of SSE `data:` lines.
fn sse_events(body: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(body)
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| serde_json::from_str(data.trim()).unwrap())
        .collect()
}

async fn create_thread(app: &Router) -> String {
    let (status, body) = call_json(app, "POST", "/api/threads", Some(json!({ "title": "Chips" }))).await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["id"].as_str().unwrap().to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, body) = call_json(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["database"], true);
    assert_eq!(body["data"]["activeGenerations"], 0);
}

#[tokio::test]
async fn test_unknown_resources_are_404() {
    let app = app();
    for uri in ["/api/threads/nope", "/api/reports/nope", "/api/shared/nope"] {
        let (status, body) = call_json(&app, "GET", uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("not found"));
    }

    let (status, _) = call_json(
        &app,
        "POST",
        "/api/threads/nope/reports/stream",
        Some(json!({ "prompt": "Analyze" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cancel_without_generation() {
    let app = app();
    let thread_id = create_thread(&app).await;
    let (status, _) = call_json(
        &app,
        "POST",
        &format!("/api/threads/{}/generation/cancel", thread_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stream_generates_and_stores_report() {
    let app = app();
    let thread_id = create_thread(&app).await;

    let (status, body) = call(
        &app,
        "POST",
        &format!("/api/threads/{}/reports/stream", thread_id),
        Some(json!({ "prompt": "Semiconductor outlook" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let events = sse_events(&body);
    let types: Vec<_> = events.iter().map(|e| e["type"].as_str().unwrap()).collect();
    assert_eq!(types.first(), Some(&"content"));
    assert_eq!(types.last(), Some(&"complete"));
    assert!(types.contains(&"sections"));
    assert!(types.contains(&"insights"));

    let complete = events.last().unwrap();
    let report_id = complete["reportId"].as_str().unwrap().to_string();
    assert_eq!(complete["sections"].as_array().unwrap().len(), 2);
    assert_eq!(complete["insights"][0]["severity"], "critical");
    assert!(complete["duration"].is_u64());

    // The stored report and the thread's history agree with the stream
    let (_, report) = call_json(&app, "GET", &format!("/api/reports/{}", report_id), None).await;
    assert_eq!(report["data"]["version"], 1);
    assert_eq!(report["data"]["htmlContent"], REPORT_CHUNKS.concat());

    let (_, reports) = call_json(
        &app,
        "GET",
        &format!("/api/threads/{}/reports", thread_id),
        None,
    )
    .await;
    assert_eq!(reports["data"][0]["id"], report_id.as_str());
    assert_eq!(reports["data"][0]["sectionCount"], 2);

    let (_, messages) = call_json(
        &app,
        "GET",
        &format!("/api/threads/{}/messages", thread_id),
        None,
    )
    .await;
    let messages = messages["data"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[1]["reportId"], report_id.as_str());

    let (_, entities) = call_json(
        &app,
        "GET",
        &format!("/api/threads/{}/entities", thread_id),
        None,
    )
    .await;
    assert!(entities["data"]
        .as_array()
        .unwrap()
        .iter()
        .any(|e| e["name"] == "NVDA" && e["reportCount"] == 1));
}

#[tokio::test]
async fn test_empty_prompt_rejected() {
    let app = app();
    let thread_id = create_thread(&app).await;
    let (status, body) = call_json(
        &app,
        "POST",
        &format!("/api/threads/{}/reports/stream", thread_id),
        Some(json!({ "prompt": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_unknown_provider_override_rejected() {
    let app = app();
    let thread_id = create_thread(&app).await;
    let (status, body) = call_json(
        &app,
        "POST",
        &format!("/api/threads/{}/reports/stream", thread_id),
        Some(json!({ "prompt": "Outlook", "provider": "ollama" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation error: Unknown provider: ollama");

    // Nothing was recorded for the rejected request
    let (_, messages) = call_json(
        &app,
        "GET",
        &format!("/api/threads/{}/messages", thread_id),
        None,
    )
    .await;
    assert_eq!(messages["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_share_and_revoke() {
    let app = app();
    let thread_id = create_thread(&app).await;
    let (_, body) = call(
        &app,
        "POST",
        &format!("/api/threads/{}/reports/stream", thread_id),
        Some(json!({ "prompt": "Outlook" })),
    )
    .await;
    let report_id = sse_events(&body).last().unwrap()["reportId"]
        .as_str()
        .unwrap()
        .to_string();

    let share_uri = format!("/api/reports/{}/share", report_id);
    let (status, share) = call_json(&app, "POST", &share_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let token = share["data"]["token"].as_str().unwrap().to_string();

    let (status, shared) = call_json(&app, "GET", &format!("/api/shared/{}", token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shared["data"]["id"], report_id.as_str());

    let (status, revoked) = call_json(&app, "DELETE", &share_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(revoked["data"], 1);

    let (status, _) = call_json(&app, "GET", &format!("/api/shared/{}", token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
