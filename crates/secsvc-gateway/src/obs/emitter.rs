//! Dual metric emission.
//!
//! Every request event is written to two backends with per-call failure
//! isolation: the counter and histogram on each backend are four independent
//! calls, and a failure in one never skips the others. The in-flight gauge
//! follows the same policy and is mirrored by a process-wide atomic counter
//! that health endpoints can read.

use std::sync::atomic::{AtomicI64, Ordering};

use secsvc_core::error::MetricsError;
use secsvc_core::metric::{self, BackendId, RequestMetricEvent};

use super::instrument::{InstrumentHandle, Labels, MetricBackend};
use super::registry::MetricRegistry;

/// The three HTTP instruments on one backend.
struct BackendInstruments {
    backend: BackendId,
    requests_total: InstrumentHandle,
    request_duration: InstrumentHandle,
    in_flight: InstrumentHandle,
}

impl BackendInstruments {
    fn resolve(registry: &MetricRegistry, backend: &dyn MetricBackend) -> Self {
        Self {
            backend: backend.id(),
            requests_total: registry.get_or_create(&metric::http_requests_total(), backend),
            request_duration: registry.get_or_create(&metric::http_request_duration(), backend),
            in_flight: registry.get_or_create(&metric::http_requests_in_flight(), backend),
        }
    }
}

/// Which backends accepted an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EmissionReport {
    pub primary: bool,
    pub secondary: bool,
}

impl EmissionReport {
    pub fn all(&self) -> bool {
        self.primary && self.secondary
    }

    pub fn any(&self) -> bool {
        self.primary || self.secondary
    }
}

/// Per-backend result of an in-flight increment. Only the backends that
/// accepted the increment are decremented later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[must_use = "an in-flight ticket must be passed back to decrement_in_flight"]
pub struct InFlightTicket {
    primary: bool,
    secondary: bool,
}

impl InFlightTicket {
    pub fn any(&self) -> bool {
        self.primary || self.secondary
    }
}

pub struct DualEmitter {
    primary: BackendInstruments,
    secondary: BackendInstruments,
    in_flight: AtomicI64,
}

impl DualEmitter {
    /// Resolve the HTTP instruments for both backends through `registry`.
    pub fn new(
        registry: &MetricRegistry,
        primary: &dyn MetricBackend,
        secondary: &dyn MetricBackend,
    ) -> Self {
        Self {
            primary: BackendInstruments::resolve(registry, primary),
            secondary: BackendInstruments::resolve(registry, secondary),
            in_flight: AtomicI64::new(0),
        }
    }

    /// Record one completed request on both backends.
    pub fn record_request(&self, event: &RequestMetricEvent) -> EmissionReport {
        let labels = event.labels();

        let primary_count = self.emit(&self.primary, metric::HTTP_REQUESTS_TOTAL, event, || {
            self.primary.requests_total.increment(&labels)
        });
        let secondary_count = self.emit(&self.secondary, metric::HTTP_REQUESTS_TOTAL, event, || {
            self.secondary.requests_total.increment(&labels)
        });
        let primary_duration = self.emit(&self.primary, metric::HTTP_REQUEST_DURATION, event, || {
            self.primary.request_duration.observe(event.duration_ms, &labels)
        });
        let secondary_duration =
            self.emit(&self.secondary, metric::HTTP_REQUEST_DURATION, event, || {
                self.secondary.request_duration.observe(event.duration_ms, &labels)
            });

        let report = EmissionReport {
            primary: primary_count && primary_duration,
            secondary: secondary_count && secondary_duration,
        };

        if report.all() {
            tracing::debug!(
                method = %event.method,
                path = %event.path_pattern,
                status = %event.status,
                duration_ms = event.duration_ms,
                "dual metrics recording completed"
            );
        } else if report.any() {
            tracing::warn!(
                method = %event.method,
                path = %event.path_pattern,
                status = %event.status,
                primary_success = report.primary,
                secondary_success = report.secondary,
                "partial metrics recording success"
            );
        } else {
            tracing::error!(
                method = %event.method,
                path = %event.path_pattern,
                status = %event.status,
                "all metrics recording failed"
            );
        }
        report
    }

    fn emit(
        &self,
        target: &BackendInstruments,
        name: &'static str,
        event: &RequestMetricEvent,
        op: impl FnOnce() -> Result<(), MetricsError>,
    ) -> bool {
        match op() {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    metric = name,
                    backend = %target.backend,
                    method = %event.method,
                    path = %event.path_pattern,
                    status = %event.status,
                    error = %e,
                    "failed to record metric"
                );
                false
            }
        }
    }

    /// Increment the in-flight gauge on both backends.
    pub fn increment_in_flight(&self) -> InFlightTicket {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        InFlightTicket {
            primary: gauge_step(&self.primary, "increment", |h, l| h.increment(l)),
            secondary: gauge_step(&self.secondary, "increment", |h, l| h.increment(l)),
        }
    }

    /// Undo an increment on exactly the backends that accepted it.
    pub fn decrement_in_flight(&self, ticket: InFlightTicket) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
        if ticket.primary {
            gauge_step(&self.primary, "decrement", |h, l| h.decrement(l));
        }
        if ticket.secondary {
            gauge_step(&self.secondary, "decrement", |h, l| h.decrement(l));
        }
    }

    /// Current number of requests between increment and decrement.
    pub fn in_flight(&self) -> i64 {
        self.in_flight.load(Ordering::Acquire)
    }
}

fn gauge_step(
    target: &BackendInstruments,
    operation: &'static str,
    op: impl FnOnce(&InstrumentHandle, &Labels<'_>) -> Result<(), MetricsError>,
) -> bool {
    let no_labels: &Labels<'_> = &[];
    match op(&target.in_flight, no_labels) {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(
                metric = metric::HTTP_REQUESTS_IN_FLIGHT,
                backend = %target.backend,
                operation,
                error = %e,
                "failed to update in-flight gauge"
            );
            false
        }
    }
}
