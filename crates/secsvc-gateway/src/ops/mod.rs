//! Operational HTTP endpoints.
//!
//! - `/health/liveness`  : process is up
//! - `/health/readiness` : 503 when draining, otherwise current in-flight count
//! - `/health/startup`   : startup finished
//! - `/health/metrics`   : registry snapshot and OTLP state
//! - exposition path     : text exposition format (not self-instrumented)

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use secsvc_core::error::SecSvcError;

use crate::app_state::AppState;

pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub async fn liveness() -> impl IntoResponse {
    Json(json!({ "status": "alive" }))
}

pub async fn readiness(State(state): State<AppState>) -> Response {
    if state.is_draining() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "draining" })),
        )
            .into_response();
    }
    Json(json!({
        "status": "ready",
        "in_flight": state.telemetry().in_flight(),
    }))
    .into_response()
}

pub async fn startup() -> impl IntoResponse {
    Json(json!({ "status": "started" }))
}

pub async fn metrics_info(State(state): State<AppState>) -> impl IntoResponse {
    let telemetry = state.telemetry();
    Json(json!({
        "registry": telemetry.registry_info(),
        "otlp_exporting": telemetry.otlp_exporting(),
        "in_flight": telemetry.in_flight(),
    }))
}

pub async fn exposition(State(state): State<AppState>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
        state.telemetry().render_exposition(),
    )
        .into_response()
}

pub async fn not_found() -> Response {
    error_response(&SecSvcError::NotFound("no route matched".into()))
}

/// JSON error body with the stable client code.
pub fn error_response(err: &SecSvcError) -> Response {
    let code = err.client_code();
    let status = StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(json!({
            "error": {
                "code": code.as_str(),
                "message": err.to_string(),
            }
        })),
    )
        .into_response()
}
