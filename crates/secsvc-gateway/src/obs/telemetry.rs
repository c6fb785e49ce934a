//! Process-wide metrics wiring.
//!
//! Built once at startup: one registry, both backends, the dual emitter and
//! the request tracker. Every descriptor is created here, never per request.

use std::sync::Arc;
use std::time::Duration;

use opentelemetry_sdk::metrics::SdkMeterProvider;

use secsvc_core::route::RouteClassifier;

use super::emitter::DualEmitter;
use super::metrics::ExpositionStore;
use super::middleware::RequestTracker;
use super::otlp::{self, OtlpBackend};
use super::registry::{MetricRegistry, RegistryInfo};
use crate::config::MetricsSection;

pub struct Telemetry {
    registry: MetricRegistry,
    exposition: Arc<ExpositionStore>,
    provider: SdkMeterProvider,
    otlp_exporting: bool,
    tracker: RequestTracker,
}

impl Telemetry {
    pub fn init(cfg: &MetricsSection) -> Self {
        let registry = MetricRegistry::new();
        let exposition = Arc::new(ExpositionStore::new());
        let (provider, otlp_exporting) = otlp::init_meter_provider(&cfg.otlp);
        let otlp_backend = OtlpBackend::new(&provider);

        let emitter = Arc::new(DualEmitter::new(&registry, exposition.as_ref(), &otlp_backend));
        let tracker = RequestTracker::new(
            emitter,
            RouteClassifier::default(),
            Duration::from_millis(cfg.slow_request_ms),
        );

        tracing::info!(
            registered = registry.len(),
            otlp_exporting,
            "metrics initialized"
        );

        Self {
            registry,
            exposition,
            provider,
            otlp_exporting,
            tracker,
        }
    }

    pub fn tracker(&self) -> RequestTracker {
        self.tracker.clone()
    }

    pub fn exposition(&self) -> &ExpositionStore {
        &self.exposition
    }

    pub fn render_exposition(&self) -> String {
        self.exposition.render()
    }

    pub fn in_flight(&self) -> i64 {
        self.tracker.emitter().in_flight()
    }

    pub fn registry_info(&self) -> RegistryInfo {
        self.registry.info()
    }

    pub fn otlp_exporting(&self) -> bool {
        self.otlp_exporting
    }

    /// Flush pending OTLP data and stop the periodic reader.
    pub fn shutdown(&self) {
        match self.provider.shutdown() {
            Ok(()) => tracing::info!("metrics provider shut down"),
            Err(e) => tracing::warn!(error = %e, "metrics provider shutdown failed"),
        }
    }
}
