//! Metric descriptors and per-request metric events.
//!
//! Descriptors are immutable and identified by name only. Events are created
//! once per completed request, handed to both emitter backends, then dropped.

use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

use crate::labels;

/// Counter of completed requests, labelled `method`, `path`, `status`.
pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
/// Request duration histogram in milliseconds, labelled `method`, `path`, `status`.
pub const HTTP_REQUEST_DURATION: &str = "http_request_duration";
/// Unlabelled gauge of requests currently being processed.
pub const HTTP_REQUESTS_IN_FLIGHT: &str = "http_requests_in_flight";

/// Histogram upper bounds in milliseconds, shared by every backend.
pub const DURATION_BUCKETS_MS: [f64; 11] = [
    5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0,
];

/// Status label used when a request faults before producing a response.
pub const FAULT_STATUS: &str = "500";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Counter,
    Histogram,
    Gauge,
}

impl MetricKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Histogram => "histogram",
            MetricKind::Gauge => "gauge",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable description of a metric instrument.
///
/// Identity is the name; two descriptors with the same name but different
/// buckets are treated as the same metric by the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDescriptor {
    pub name: Cow<'static, str>,
    pub kind: MetricKind,
    pub description: Cow<'static, str>,
    pub unit: Cow<'static, str>,
    /// Ordered upper bounds; empty for non-histograms.
    pub buckets: Vec<f64>,
}

impl MetricDescriptor {
    pub fn counter(
        name: impl Into<Cow<'static, str>>,
        description: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: MetricKind::Counter,
            description: description.into(),
            unit: Cow::Borrowed("1"),
            buckets: Vec::new(),
        }
    }

    pub fn gauge(
        name: impl Into<Cow<'static, str>>,
        description: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: MetricKind::Gauge,
            description: description.into(),
            unit: Cow::Borrowed("1"),
            buckets: Vec::new(),
        }
    }

    /// Histogram descriptor. Bounds are sorted and deduplicated so the
    /// backends can rely on strictly increasing buckets.
    pub fn histogram(
        name: impl Into<Cow<'static, str>>,
        description: impl Into<Cow<'static, str>>,
        unit: impl Into<Cow<'static, str>>,
        buckets: &[f64],
    ) -> Self {
        let mut bounds: Vec<f64> = buckets.iter().copied().filter(|b| b.is_finite()).collect();
        bounds.sort_by(f64::total_cmp);
        bounds.dedup();
        Self {
            name: name.into(),
            kind: MetricKind::Histogram,
            description: description.into(),
            unit: unit.into(),
            buckets: bounds,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// `http_requests_total` descriptor.
pub fn http_requests_total() -> MetricDescriptor {
    MetricDescriptor::counter(HTTP_REQUESTS_TOTAL, "Total number of HTTP requests")
}

/// `http_request_duration` descriptor (milliseconds, fixed buckets).
pub fn http_request_duration() -> MetricDescriptor {
    MetricDescriptor::histogram(
        HTTP_REQUEST_DURATION,
        "HTTP request duration in milliseconds",
        "ms",
        &DURATION_BUCKETS_MS,
    )
}

/// `http_requests_in_flight` descriptor.
pub fn http_requests_in_flight() -> MetricDescriptor {
    MetricDescriptor::gauge(
        HTTP_REQUESTS_IN_FLIGHT,
        "Number of HTTP requests currently being processed",
    )
}

/// Identifier of a metric backend (one registry slot per name and backend).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BackendId(pub &'static str);

impl BackendId {
    /// Pull-style text exposition.
    pub const EXPOSITION: BackendId = BackendId("exposition");
    /// Push-style OTLP export.
    pub const OTLP: BackendId = BackendId("otlp");

    pub fn as_str(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// How the downstream pipeline finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// A response was produced with this status code.
    Completed(u16),
    /// The downstream raised an unhandled fault.
    Faulted,
}

/// One completed request, with labels already normalized.
#[derive(Debug, Clone)]
pub struct RequestMetricEvent {
    pub method: Cow<'static, str>,
    pub path_pattern: String,
    pub status: Cow<'static, str>,
    pub duration_ms: f64,
}

impl RequestMetricEvent {
    /// Build an event from raw request data. `path_pattern` must already be
    /// classified.
    pub fn new(
        raw_method: &str,
        path_pattern: String,
        completion: Completion,
        elapsed: Duration,
    ) -> Self {
        let status = match completion {
            Completion::Completed(code) => labels::normalize_status(i64::from(code)),
            Completion::Faulted => Cow::Borrowed(FAULT_STATUS),
        };
        Self {
            method: labels::normalize_method(raw_method),
            path_pattern,
            status,
            duration_ms: elapsed.as_secs_f64() * 1000.0,
        }
    }

    /// Label set shared by the counter and histogram.
    pub fn labels(&self) -> [(&str, &str); 3] {
        [
            ("method", self.method.as_ref()),
            ("path", self.path_pattern.as_str()),
            ("status", self.status.as_ref()),
        ]
    }
}
