#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    routing::get,
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use secsvc_core::metric;
use secsvc_gateway::{app_state::AppState, config::GatewayConfig, ops, router::build_router};

fn state() -> AppState {
    let mut cfg = GatewayConfig::default();
    cfg.metrics.otlp.enabled = false;
    AppState::new(cfg)
}

fn api() -> Router {
    Router::new()
        .route("/api/v1/securities", get(|| async { "[]" }))
        .route("/api/v1/securities/:id", get(|| async { "{}" }))
}

async fn send(app: &Router, uri: &str) -> (StatusCode, Option<String>, String) {
    let res = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = res.status();
    let content_type = res
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
}

fn requests(state: &AppState, path: &str, status: &str) -> Option<f64> {
    state.telemetry().exposition().counter_value(
        metric::HTTP_REQUESTS_TOTAL,
        &[("method", "GET"), ("path", path), ("status", status)],
    )
}

#[tokio::test]
async fn health_endpoints_report_status() {
    let app = build_router(state(), Router::new());

    let (status, _, body) = send(&app, "/health/liveness").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_str::<Value>(&body).unwrap()["status"], "alive");

    let (status, _, body) = send(&app, "/health/startup").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_str::<Value>(&body).unwrap()["status"], "started");
}

#[tokio::test]
async fn readiness_counts_itself_and_turns_503_when_draining() {
    let state = state();
    let app = build_router(state.clone(), Router::new());

    let (status, _, body) = send(&app, "/health/readiness").await;
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ready");
    assert_eq!(json["in_flight"], 1);

    state.begin_draining();
    let (status, _, body) = send(&app, "/health/readiness").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(serde_json::from_str::<Value>(&body).unwrap()["status"], "draining");
    assert_eq!(requests(&state, "/health/{check_type}", "503"), Some(1.0));
}

#[tokio::test]
async fn api_routes_are_instrumented_with_patterns() {
    let state = state();
    let app = build_router(state.clone(), api());

    send(&app, "/api/v1/securities/60c72b2f9b1e8b3f8c8b4567").await;
    send(&app, "/api/v1/securities/42").await;
    send(&app, "/api/v1/securities").await;

    assert_eq!(requests(&state, "/api/v1/securities/{id}", "200"), Some(2.0));
    assert_eq!(requests(&state, "/api/v1/securities", "200"), Some(1.0));
    assert_eq!(state.telemetry().in_flight(), 0);
}

#[tokio::test]
async fn exposition_is_served_and_not_self_instrumented() {
    let state = state();
    let app = build_router(state.clone(), api());

    send(&app, "/api/v1/securities").await;
    send(&app, "/metrics").await;
    let (status, content_type, body) = send(&app, "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some(ops::EXPOSITION_CONTENT_TYPE));
    assert!(body.contains("# TYPE http_requests_total counter"));
    assert!(body.contains("# TYPE http_request_duration histogram"));
    assert!(body.contains("# TYPE http_requests_in_flight gauge"));
    assert!(body.contains(r#"path="/api/v1/securities""#));
    assert!(!body.contains(r#"path="/metrics""#));
    assert_eq!(requests(&state, "/metrics", "200"), None);
}

#[tokio::test]
async fn first_scrape_reports_zero_in_flight() {
    let state = state();
    let app = build_router(state.clone(), api());

    let (status, _, body) = send(&app, "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\nhttp_requests_in_flight 0\n"), "{body}");
    assert!(!body.contains("http_requests_total{"));
    assert_eq!(state.telemetry().in_flight(), 0);
}

#[tokio::test]
async fn exposition_path_is_configurable() {
    let mut cfg = GatewayConfig::default();
    cfg.metrics.otlp.enabled = false;
    cfg.metrics.exposition_path = "/internal/scrape".into();
    let app = build_router(AppState::new(cfg), Router::new());

    let (status, _, body) = send(&app, "/internal/scrape").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("# HELP http_requests_total"));

    let (status, _, _) = send(&app, "/metrics").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unmatched_route_is_json_404_and_recorded() {
    let state = state();
    let app = build_router(state.clone(), api());

    let (status, _, body) = send(&app, "/orders/12345/items").await;
    let json: Value = serde_json::from_str(&body).unwrap();

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "NOT_FOUND");
    assert_eq!(requests(&state, "/orders/{id}/items", "404"), Some(1.0));
}

#[tokio::test]
async fn registry_debug_endpoint_lists_both_backends() {
    let app = build_router(state(), Router::new());

    let (status, _, body) = send(&app, "/health/metrics").await;
    let json: Value = serde_json::from_str(&body).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["otlp_exporting"], false);
    assert_eq!(json["registry"]["noop_count"], 0);
    let registered = json["registry"]["registered"].as_array().unwrap();
    assert_eq!(registered.len(), 6);
    assert_eq!(registered.iter().filter(|e| e["backend"] == "otlp").count(), 3);
    assert_eq!(registered.iter().filter(|e| e["backend"] == "exposition").count(), 3);
}
