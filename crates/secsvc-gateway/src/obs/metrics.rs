//! Pull-style exposition backend.
//!
//! Counter/gauge/histogram families with dynamic labels backed by `DashMap`.
//! Labels are flattened into sorted key vectors to keep deterministic
//! ordering. Values are `f64` stored as bit patterns in atomics so the
//! recording path never takes a lock beyond the map shard.
//!
//! The store is rendered on demand in the line-oriented text exposition format.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use secsvc_core::error::MetricsError;
use secsvc_core::metric::{BackendId, MetricDescriptor, MetricKind};

use super::instrument::{ensure_finite, kind_mismatch, Instrument, Labels, MetricBackend};

type LabelKey = Vec<(String, String)>;

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn label_key(labels: &Labels<'_>) -> LabelKey {
    let mut key: LabelKey = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    key.sort();
    key
}

fn label_str(key: &LabelKey) -> String {
    key.iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",")
}

fn series(name: &str, labels: &str) -> String {
    if labels.is_empty() {
        name.to_string()
    } else {
        format!("{name}{{{labels}}}")
    }
}

/// `f64` with atomic add, stored as bits.
#[derive(Default)]
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, v: f64) {
        self.0.store(v.to_bits(), Ordering::Relaxed);
    }

    fn fetch_add(&self, v: f64) {
        let mut cur = self.0.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(cur) + v).to_bits();
            match self
                .0
                .compare_exchange_weak(cur, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(actual) => cur = actual,
            }
        }
    }
}

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<LabelKey, AtomicF64>,
}

impl CounterVec {
    /// Increment by an arbitrary non-negative value.
    pub fn add(&self, labels: &Labels<'_>, v: f64) {
        self.map.entry(label_key(labels)).or_default().fetch_add(v);
    }

    pub fn get(&self, labels: &Labels<'_>) -> Option<f64> {
        self.map.get(&label_key(labels)).map(|r| r.value().load())
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {} counter", name);
        for (labels, val) in sorted(&self.map, AtomicF64::load) {
            let _ = writeln!(out, "{} {}", series(name, &label_str(&labels)), val);
        }
    }
}

#[derive(Default)]
pub struct GaugeVec {
    map: DashMap<LabelKey, AtomicF64>,
}

impl GaugeVec {
    /// Add an arbitrary signed delta.
    pub fn add(&self, labels: &Labels<'_>, v: f64) {
        self.map.entry(label_key(labels)).or_default().fetch_add(v);
    }

    pub fn set(&self, labels: &Labels<'_>, v: f64) {
        self.map.entry(label_key(labels)).or_default().store(v);
    }

    pub fn get(&self, labels: &Labels<'_>) -> Option<f64> {
        self.map.get(&label_key(labels)).map(|r| r.value().load())
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {} gauge", name);
        for (labels, val) in sorted(&self.map, AtomicF64::load) {
            let _ = writeln!(out, "{} {}", series(name, &label_str(&labels)), val);
        }
    }
}

struct AtomicHistogram {
    count: AtomicU64,
    sum: AtomicF64,
    /// Cumulative: bucket `i` counts observations `<= bounds[i]`.
    buckets: Vec<AtomicU64>,
}

impl AtomicHistogram {
    fn new(n: usize) -> Self {
        Self {
            count: AtomicU64::new(0),
            sum: AtomicF64::default(),
            buckets: (0..n).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    fn snapshot(&self, bounds: &[f64]) -> HistogramSnapshot {
        HistogramSnapshot {
            count: self.count.load(Ordering::Relaxed),
            sum: self.sum.load(),
            buckets: bounds
                .iter()
                .zip(&self.buckets)
                .map(|(le, c)| (*le, c.load(Ordering::Relaxed)))
                .collect(),
        }
    }
}

/// Point-in-time view of one histogram series.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSnapshot {
    pub count: u64,
    pub sum: f64,
    /// `(upper bound, cumulative count)`.
    pub buckets: Vec<(f64, u64)>,
}

impl HistogramSnapshot {
    /// Observations in `(lower, upper]`, both being configured bounds.
    pub fn between(&self, lower: f64, upper: f64) -> u64 {
        let at = |le: f64| {
            self.buckets
                .iter()
                .find(|(b, _)| *b == le)
                .map(|(_, c)| *c)
                .unwrap_or(0)
        };
        at(upper).saturating_sub(at(lower))
    }
}

pub struct HistogramVec {
    bounds: Vec<f64>,
    map: DashMap<LabelKey, AtomicHistogram>,
}

impl HistogramVec {
    pub fn new(bounds: Vec<f64>) -> Self {
        Self {
            bounds,
            map: DashMap::new(),
        }
    }

    /// Observe a value and increment cumulative buckets.
    pub fn observe(&self, labels: &Labels<'_>, v: f64) {
        let n = self.bounds.len();
        let hist = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicHistogram::new(n));

        hist.count.fetch_add(1, Ordering::Relaxed);
        hist.sum.fetch_add(v);

        // Cumulative Buckets: Increment ALL buckets larger than value
        for (i, &b) in self.bounds.iter().enumerate() {
            if v <= b {
                hist.buckets[i].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn get(&self, labels: &Labels<'_>) -> Option<HistogramSnapshot> {
        self.map
            .get(&label_key(labels))
            .map(|r| r.value().snapshot(&self.bounds))
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {} histogram", name);
        for (key, snap) in sorted(&self.map, |h| h.snapshot(&self.bounds)) {
            let labels = label_str(&key);
            let prefix = if labels.is_empty() {
                String::new()
            } else {
                format!("{},", labels)
            };

            for (le, count) in &snap.buckets {
                let _ = writeln!(out, "{}_bucket{{{}le=\"{}\"}} {}", name, prefix, le, count);
            }
            let _ = writeln!(out, "{}_bucket{{{}le=\"+Inf\"}} {}", name, prefix, snap.count);
            let _ = writeln!(out, "{} {}", series(&format!("{name}_sum"), &labels), snap.sum);
            let _ = writeln!(out, "{} {}", series(&format!("{name}_count"), &labels), snap.count);
        }
    }
}

/// Copy series out of a family in label order so renders are stable.
fn sorted<V, T>(map: &DashMap<LabelKey, V>, read: impl Fn(&V) -> T) -> Vec<(LabelKey, T)> {
    let mut rows: Vec<(LabelKey, T)> = map
        .iter()
        .map(|r| (r.key().clone(), read(r.value())))
        .collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0));
    rows
}

enum Family {
    Counter(CounterVec),
    Gauge(GaugeVec),
    Histogram(HistogramVec),
}

/// One registered family in the exposition store.
pub struct ExpositionInstrument {
    descriptor: MetricDescriptor,
    family: Family,
}

impl ExpositionInstrument {
    fn new(descriptor: &MetricDescriptor) -> Self {
        let family = match descriptor.kind {
            MetricKind::Counter => Family::Counter(CounterVec::default()),
            MetricKind::Gauge => {
                // unlabelled series reads 0 before the first update
                let g = GaugeVec::default();
                g.set(&[], 0.0);
                Family::Gauge(g)
            }
            MetricKind::Histogram => Family::Histogram(HistogramVec::new(descriptor.buckets.clone())),
        };
        Self {
            descriptor: descriptor.clone(),
            family,
        }
    }

    fn render(&self, out: &mut String) {
        let name = self.descriptor.name();
        let _ = writeln!(out, "# HELP {} {}", name, self.descriptor.description);
        match &self.family {
            Family::Counter(c) => c.render(name, out),
            Family::Gauge(g) => g.render(name, out),
            Family::Histogram(h) => h.render(name, out),
        }
    }
}

impl Instrument for ExpositionInstrument {
    fn descriptor(&self) -> &MetricDescriptor {
        &self.descriptor
    }

    fn add(&self, delta: f64, labels: &Labels<'_>) -> Result<(), MetricsError> {
        ensure_finite(&self.descriptor, delta)?;
        match &self.family {
            Family::Counter(c) if delta >= 0.0 => {
                c.add(labels, delta);
                Ok(())
            }
            Family::Counter(_) => Err(MetricsError::InvalidValue {
                name: self.descriptor.name().to_string(),
                value: delta,
            }),
            Family::Gauge(g) => {
                g.add(labels, delta);
                Ok(())
            }
            Family::Histogram(_) => Err(kind_mismatch(&self.descriptor, "add")),
        }
    }

    fn observe(&self, value: f64, labels: &Labels<'_>) -> Result<(), MetricsError> {
        ensure_finite(&self.descriptor, value)?;
        match &self.family {
            Family::Histogram(h) => {
                h.observe(labels, value);
                Ok(())
            }
            _ => Err(kind_mismatch(&self.descriptor, "observe")),
        }
    }

    fn set(&self, value: f64, labels: &Labels<'_>) -> Result<(), MetricsError> {
        ensure_finite(&self.descriptor, value)?;
        match &self.family {
            Family::Gauge(g) => {
                g.set(labels, value);
                Ok(())
            }
            _ => Err(kind_mismatch(&self.descriptor, "set")),
        }
    }
}

/// Backend A: in-process families scraped through the exposition endpoint.
#[derive(Default)]
pub struct ExpositionStore {
    families: DashMap<String, Arc<ExpositionInstrument>>,
}

impl ExpositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render all families, ordered by name.
    pub fn render(&self) -> String {
        let mut families: Vec<Arc<ExpositionInstrument>> =
            self.families.iter().map(|r| Arc::clone(r.value())).collect();
        families.sort_by(|a, b| a.descriptor.name().cmp(b.descriptor.name()));

        let mut out = String::new();
        for f in &families {
            f.render(&mut out);
        }
        out
    }

    pub fn counter_value(&self, name: &str, labels: &Labels<'_>) -> Option<f64> {
        match &self.families.get(name)?.family {
            Family::Counter(c) => c.get(labels),
            _ => None,
        }
    }

    pub fn gauge_value(&self, name: &str, labels: &Labels<'_>) -> Option<f64> {
        match &self.families.get(name)?.family {
            Family::Gauge(g) => g.get(labels),
            _ => None,
        }
    }

    pub fn histogram(&self, name: &str, labels: &Labels<'_>) -> Option<HistogramSnapshot> {
        match &self.families.get(name)?.family {
            Family::Histogram(h) => h.get(labels),
            _ => None,
        }
    }
}

impl MetricBackend for ExpositionStore {
    fn id(&self) -> BackendId {
        BackendId::EXPOSITION
    }

    fn create(&self, descriptor: &MetricDescriptor) -> Result<Arc<dyn Instrument>, MetricsError> {
        match self.families.entry(descriptor.name().to_string()) {
            Entry::Occupied(_) => Err(MetricsError::AlreadyRegistered {
                name: descriptor.name().to_string(),
                backend: BackendId::EXPOSITION.as_str(),
            }),
            Entry::Vacant(slot) => {
                let instrument = Arc::new(ExpositionInstrument::new(descriptor));
                slot.insert(Arc::clone(&instrument));
                let out: Arc<dyn Instrument> = instrument;
                Ok(out)
            }
        }
    }
}
