//! Request instrumentation.
//!
//! `RequestTracker::track` wraps one downstream invocation: it raises the
//! in-flight gauge, times the call, classifies the path and records the
//! outcome on both backends. The axum middleware and the `Instrumented`
//! wrapper are thin adapters over it.
//!
//! A downstream panic is captured, recorded as a fault, then resumed with the
//! original payload. The in-flight gauge is restored by `InFlightGuard` on
//! every exit, including the wrapping future being dropped mid-request.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use futures_util::FutureExt;

use secsvc_core::http::{RequestDescriptor, ResponseDescriptor};
use secsvc_core::metric::{Completion, RequestMetricEvent};
use secsvc_core::route::RouteClassifier;

use super::emitter::{DualEmitter, InFlightTicket};

/// Status code carried by a downstream result, `None` for a faulted result.
pub trait StatusOutcome {
    fn status_code(&self) -> Option<u16>;
}

impl StatusOutcome for Response {
    fn status_code(&self) -> Option<u16> {
        Some(self.status().as_u16())
    }
}

impl StatusOutcome for ResponseDescriptor {
    fn status_code(&self) -> Option<u16> {
        Some(self.status)
    }
}

impl<T: StatusOutcome, E> StatusOutcome for Result<T, E> {
    fn status_code(&self) -> Option<u16> {
        self.as_ref().ok().and_then(StatusOutcome::status_code)
    }
}

/// Holds one in-flight increment until dropped.
pub struct InFlightGuard {
    emitter: Arc<DualEmitter>,
    ticket: Option<InFlightTicket>,
}

impl InFlightGuard {
    pub fn acquire(emitter: Arc<DualEmitter>) -> Self {
        let ticket = emitter.increment_in_flight();
        Self {
            emitter,
            ticket: Some(ticket),
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            self.emitter.decrement_in_flight(ticket);
        }
    }
}

#[derive(Clone)]
pub struct RequestTracker {
    emitter: Arc<DualEmitter>,
    classifier: RouteClassifier,
    slow_threshold: Duration,
}

impl RequestTracker {
    pub fn new(emitter: Arc<DualEmitter>, classifier: RouteClassifier, slow_threshold: Duration) -> Self {
        Self {
            emitter,
            classifier,
            slow_threshold,
        }
    }

    pub fn emitter(&self) -> &Arc<DualEmitter> {
        &self.emitter
    }

    /// Run `fut` as one instrumented request and return its output unchanged.
    pub async fn track<F, T>(&self, method: &str, path: &str, fut: F) -> T
    where
        F: Future<Output = T>,
        T: StatusOutcome,
    {
        let guard = InFlightGuard::acquire(Arc::clone(&self.emitter));
        let start = Instant::now();

        let outcome = AssertUnwindSafe(fut).catch_unwind().await;
        let elapsed = start.elapsed();

        let completion = match &outcome {
            Ok(result) => result
                .status_code()
                .map_or(Completion::Faulted, Completion::Completed),
            Err(_) => Completion::Faulted,
        };

        let event = RequestMetricEvent::new(method, self.classifier.classify(path), completion, elapsed);
        self.emitter.record_request(&event);

        if elapsed > self.slow_threshold {
            tracing::warn!(
                method = %event.method,
                path = %event.path_pattern,
                status = %event.status,
                duration_ms = event.duration_ms,
                "slow request detected"
            );
        }

        drop(guard);

        match outcome {
            Ok(result) => result,
            Err(payload) => std::panic::resume_unwind(payload),
        }
    }
}

/// axum middleware; install with `from_fn_with_state(tracker, http_metrics)`.
///
/// Duration is measured until the handler returns the response head. Body
/// bytes still being streamed to the client are not included; the JSON and
/// exposition handlers return fully buffered bodies.
pub async fn http_metrics(State(tracker): State<RequestTracker>, req: Request, next: Next) -> Response {
    let method = req.method().as_str().to_owned();
    let path = req.uri().path().to_owned();
    tracker.track(&method, &path, next.run(req)).await
}

/// Downstream handler seam for non-axum callers.
#[async_trait]
pub trait NextHandler: Send + Sync {
    type Error: Send;

    async fn call(&self, req: RequestDescriptor) -> Result<ResponseDescriptor, Self::Error>;
}

/// Wraps a `NextHandler` so every call is tracked. An `Err` is recorded as a
/// fault and returned as is.
pub struct Instrumented<H> {
    inner: H,
    tracker: RequestTracker,
}

impl<H: NextHandler> Instrumented<H> {
    pub fn new(inner: H, tracker: RequestTracker) -> Self {
        Self { inner, tracker }
    }
}

#[async_trait]
impl<H: NextHandler> NextHandler for Instrumented<H> {
    type Error = H::Error;

    async fn call(&self, req: RequestDescriptor) -> Result<ResponseDescriptor, Self::Error> {
        let method = req.method.clone();
        let path = req.path.clone();
        self.tracker.track(&method, &path, self.inner.call(req)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_results_carry_no_status() {
        let ok: Result<ResponseDescriptor, ()> = Ok(ResponseDescriptor::new(404));
        let err: Result<ResponseDescriptor, ()> = Err(());
        assert_eq!(ok.status_code(), Some(404));
        assert_eq!(err.status_code(), None);
    }
}
