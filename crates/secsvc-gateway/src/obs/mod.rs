//! HTTP request metrics.
//!
//! Each completed request is recorded on two backends: the in-process
//! exposition store (scraped at the exposition path) and an OTLP meter
//! (pushed periodically). Recording failures stay inside this module.

pub mod emitter;
pub mod instrument;
pub mod metrics;
pub mod middleware;
pub mod otlp;
pub mod registry;
pub mod telemetry;

pub use emitter::{DualEmitter, EmissionReport, InFlightTicket};
pub use instrument::{Instrument, InstrumentHandle, Labels, MetricBackend};
pub use metrics::{ExpositionStore, HistogramSnapshot};
pub use middleware::{http_metrics, InFlightGuard, Instrumented, NextHandler, RequestTracker, StatusOutcome};
pub use otlp::OtlpBackend;
pub use registry::{MetricRegistry, RegistryInfo};
pub use telemetry::Telemetry;
