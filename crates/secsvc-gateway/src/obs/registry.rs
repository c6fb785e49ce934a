//! Name-keyed instrument registry.
//!
//! At most one handle exists per `(name, backend)` for the registry's
//! lifetime. Concurrent first use converges through `DashMap::entry`, which
//! holds the shard lock while the backend creates the instrument.
//!
//! Creation failures degrade to a no-op handle; they are logged and never
//! reach the caller.

use dashmap::DashMap;
use serde::Serialize;

use secsvc_core::metric::{BackendId, MetricDescriptor};

use super::instrument::{InstrumentHandle, MetricBackend};

type Key = (String, BackendId);

#[derive(Default)]
pub struct MetricRegistry {
    handles: DashMap<Key, InstrumentHandle>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the existing handle for `descriptor.name` on `backend`, or
    /// create one. Only the name is compared; other descriptor fields of a
    /// later call are ignored (logged when they differ).
    pub fn get_or_create(
        &self,
        descriptor: &MetricDescriptor,
        backend: &dyn MetricBackend,
    ) -> InstrumentHandle {
        let key = (descriptor.name().to_string(), backend.id());

        if let Some(existing) = self.handles.get(&key) {
            warn_if_diverged(existing.value(), descriptor, backend.id());
            tracing::debug!(metric = %descriptor.name(), backend = %backend.id(), "returning existing metric");
            return existing.value().clone();
        }

        self.handles
            .entry(key)
            .or_insert_with(|| match backend.create(descriptor) {
                Ok(instrument) => {
                    tracing::debug!(metric = %descriptor.name(), backend = %backend.id(), "created new metric");
                    InstrumentHandle::Live(instrument)
                }
                Err(e) => {
                    tracing::warn!(
                        metric = %descriptor.name(),
                        backend = %backend.id(),
                        error = %e,
                        "metric registration failed, using no-op instrument"
                    );
                    InstrumentHandle::noop(descriptor)
                }
            })
            .value()
            .clone()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Debug snapshot of what has been registered.
    pub fn info(&self) -> RegistryInfo {
        let mut entries: Vec<RegistryEntry> = self
            .handles
            .iter()
            .map(|r| RegistryEntry {
                name: r.key().0.clone(),
                backend: r.key().1.as_str(),
                kind: r.value().descriptor().kind.as_str(),
                noop: r.value().is_noop(),
            })
            .collect();
        entries.sort_by(|a, b| (a.backend, &a.name).cmp(&(b.backend, &b.name)));

        RegistryInfo {
            noop_count: entries.iter().filter(|e| e.noop).count(),
            registered: entries,
        }
    }
}

fn warn_if_diverged(existing: &InstrumentHandle, requested: &MetricDescriptor, backend: BackendId) {
    let registered = existing.descriptor();
    if registered != requested {
        tracing::warn!(
            metric = %requested.name(),
            backend = %backend,
            registered_kind = %registered.kind,
            requested_kind = %requested.kind,
            "metric requested with a different descriptor, keeping the registered one"
        );
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistryEntry {
    pub name: String,
    pub backend: &'static str,
    pub kind: &'static str,
    pub noop: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistryInfo {
    pub registered: Vec<RegistryEntry>,
    pub noop_count: usize,
}
