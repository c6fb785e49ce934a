//! Shared application state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::obs::Telemetry;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    telemetry: Arc<Telemetry>,
    draining: AtomicBool,
}

impl AppState {
    /// Build state and initialize metrics from `cfg.metrics`.
    pub fn new(cfg: GatewayConfig) -> Self {
        let telemetry = Arc::new(Telemetry::init(&cfg.metrics));
        Self::with_telemetry(cfg, telemetry)
    }

    pub fn with_telemetry(cfg: GatewayConfig, telemetry: Arc<Telemetry>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                cfg,
                telemetry,
                draining: AtomicBool::new(false),
            }),
        }
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn telemetry(&self) -> &Arc<Telemetry> {
        &self.inner.telemetry
    }

    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::Acquire)
    }

    /// Readiness reports 503 from now on.
    pub fn begin_draining(&self) {
        self.inner.draining.store(true, Ordering::Release);
    }
}
