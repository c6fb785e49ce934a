//! Axum router wiring.
//!
//! Health routes, the caller's API routes and the JSON 404 fallback sit
//! inside the metrics layer. The exposition route is added after the layer,
//! so scrapes are never counted.

use axum::{middleware, routing::get, Router};

use crate::{app_state::AppState, obs, ops};

/// `api` must not set its own fallback.
pub fn build_router(state: AppState, api: Router) -> Router {
    let tracker = state.telemetry().tracker();
    let exposition_path = state.cfg().metrics.exposition_path.clone();

    let instrumented = Router::new()
        .route("/health/liveness", get(ops::liveness))
        .route("/health/readiness", get(ops::readiness))
        .route("/health/startup", get(ops::startup))
        .route("/health/metrics", get(ops::metrics_info))
        .with_state(state.clone())
        .merge(api)
        .fallback(ops::not_found)
        .layer(middleware::from_fn_with_state(tracker, obs::http_metrics));

    instrumented.route(&exposition_path, get(ops::exposition).with_state(state))
}
