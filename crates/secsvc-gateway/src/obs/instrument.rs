//! Instrument and backend traits shared by the exposition and OTLP backends.
//!
//! A backend turns a `MetricDescriptor` into a live `Instrument`. Callers never
//! hold the instrument directly; they get an `InstrumentHandle`, which is
//! either a live instrument or a no-op selected when creation failed.

use std::sync::Arc;

use secsvc_core::error::MetricsError;
use secsvc_core::metric::{BackendId, MetricDescriptor};

/// `(key, value)` label pairs. Order does not matter; backends sort.
pub type Labels<'a> = [(&'a str, &'a str)];

/// A created metric instrument on one backend.
pub trait Instrument: Send + Sync {
    fn descriptor(&self) -> &MetricDescriptor;
    /// Counter increment or gauge delta.
    fn add(&self, delta: f64, labels: &Labels<'_>) -> Result<(), MetricsError>;
    /// Histogram observation.
    fn observe(&self, value: f64, labels: &Labels<'_>) -> Result<(), MetricsError>;
    /// Gauge absolute value.
    fn set(&self, value: f64, labels: &Labels<'_>) -> Result<(), MetricsError>;
}

/// A metrics backend able to create instruments.
pub trait MetricBackend: Send + Sync {
    fn id(&self) -> BackendId;
    fn create(&self, descriptor: &MetricDescriptor) -> Result<Arc<dyn Instrument>, MetricsError>;
}

/// Registry handle: a live instrument or the no-op fallback.
#[derive(Clone)]
pub enum InstrumentHandle {
    Live(Arc<dyn Instrument>),
    Noop(Arc<MetricDescriptor>),
}

impl InstrumentHandle {
    pub fn noop(descriptor: &MetricDescriptor) -> Self {
        InstrumentHandle::Noop(Arc::new(descriptor.clone()))
    }

    pub fn descriptor(&self) -> &MetricDescriptor {
        match self {
            InstrumentHandle::Live(i) => i.descriptor(),
            InstrumentHandle::Noop(d) => d,
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, InstrumentHandle::Noop(_))
    }

    pub fn increment(&self, labels: &Labels<'_>) -> Result<(), MetricsError> {
        self.add(1.0, labels)
    }

    pub fn decrement(&self, labels: &Labels<'_>) -> Result<(), MetricsError> {
        self.add(-1.0, labels)
    }

    pub fn add(&self, delta: f64, labels: &Labels<'_>) -> Result<(), MetricsError> {
        match self {
            InstrumentHandle::Live(i) => i.add(delta, labels),
            InstrumentHandle::Noop(_) => Ok(()),
        }
    }

    pub fn observe(&self, value: f64, labels: &Labels<'_>) -> Result<(), MetricsError> {
        match self {
            InstrumentHandle::Live(i) => i.observe(value, labels),
            InstrumentHandle::Noop(_) => Ok(()),
        }
    }

    pub fn set(&self, value: f64, labels: &Labels<'_>) -> Result<(), MetricsError> {
        match self {
            InstrumentHandle::Live(i) => i.set(value, labels),
            InstrumentHandle::Noop(_) => Ok(()),
        }
    }

    /// Whether both handles record into the same underlying instrument.
    pub fn same_instrument(&self, other: &InstrumentHandle) -> bool {
        match (self, other) {
            (InstrumentHandle::Live(a), InstrumentHandle::Live(b)) => Arc::ptr_eq(a, b),
            (InstrumentHandle::Noop(a), InstrumentHandle::Noop(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl std::fmt::Debug for InstrumentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let variant = if self.is_noop() { "Noop" } else { "Live" };
        f.debug_struct("InstrumentHandle")
            .field("variant", &variant)
            .field("name", &self.descriptor().name())
            .finish()
    }
}

/// Reject NaN/infinite values before they reach a backend.
pub(crate) fn ensure_finite(descriptor: &MetricDescriptor, value: f64) -> Result<(), MetricsError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(MetricsError::InvalidValue {
            name: descriptor.name().to_string(),
            value,
        })
    }
}

pub(crate) fn kind_mismatch(descriptor: &MetricDescriptor, op: &'static str) -> MetricsError {
    MetricsError::KindMismatch {
        name: descriptor.name().to_string(),
        kind: descriptor.kind.as_str(),
        op,
    }
}
