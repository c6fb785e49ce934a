//! secsvc core: runtime-free metrics primitives, labels, route classification and error types.
//!
//! This crate defines the metric descriptors, the label and route
//! normalization used for every request, and the error surface shared by the
//! gateway. It intentionally carries no HTTP or async runtime dependencies.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Classification and normalization are total: bad input maps to sentinel
//! labels instead of errors.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod http;
pub mod labels;
pub mod metric;
pub mod route;

/// Shared result type.
pub use error::{MetricsError, Result, SecSvcError};
pub use metric::{BackendId, Completion, MetricDescriptor, MetricKind, RequestMetricEvent};
pub use route::RouteClassifier;
