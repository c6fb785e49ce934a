//! Push-style OTLP backend.
//!
//! Instruments are created from an OpenTelemetry `Meter`; recording is a
//! local aggregation and export happens on the `PeriodicReader` interval, off
//! the request path. When the exporter cannot be built the provider has no
//! reader: instruments still accept values, nothing leaves the process.

use std::sync::Arc;
use std::time::Duration;

use opentelemetry::metrics::{Counter, Histogram, Meter, MeterProvider as _, UpDownCounter};
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::{runtime, Resource};

use secsvc_core::error::MetricsError;
use secsvc_core::metric::{BackendId, MetricDescriptor, MetricKind};

use super::instrument::{ensure_finite, kind_mismatch, Instrument, Labels, MetricBackend};
use crate::config::OtlpSection;

const METER_NAME: &str = "secsvc-http";

/// Build the meter provider described by `cfg`.
///
/// Returns the provider and whether an exporter is attached.
pub fn init_meter_provider(cfg: &OtlpSection) -> (SdkMeterProvider, bool) {
    let resource = Resource::new(vec![
        KeyValue::new("service.name", cfg.service_name.clone()),
        KeyValue::new("service.version", cfg.service_version.clone()),
    ]);

    if !cfg.enabled {
        tracing::debug!("OTLP metrics export disabled");
        return (SdkMeterProvider::builder().with_resource(resource).build(), false);
    }

    match build_reader(cfg) {
        Ok(reader) => {
            tracing::info!(
                endpoint = %cfg.endpoint,
                service_name = %cfg.service_name,
                export_interval_ms = cfg.export_interval_ms,
                "OTLP metrics exporter initialized"
            );
            let provider = SdkMeterProvider::builder()
                .with_reader(reader)
                .with_resource(resource)
                .build();
            (provider, true)
        }
        Err(e) => {
            tracing::warn!(
                endpoint = %cfg.endpoint,
                error = %e,
                "failed to initialize OTLP metrics exporter, metrics will only be exposed locally"
            );
            (SdkMeterProvider::builder().with_resource(resource).build(), false)
        }
    }
}

fn build_reader(cfg: &OtlpSection) -> Result<PeriodicReader, MetricsError> {
    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(cfg.endpoint.clone())
        .build()
        .map_err(|e| MetricsError::Exporter(e.to_string()))?;

    Ok(PeriodicReader::builder(exporter, runtime::Tokio)
        .with_interval(Duration::from_millis(cfg.export_interval_ms))
        .build())
}

/// Backend B: OpenTelemetry instruments on one meter.
pub struct OtlpBackend {
    meter: Meter,
}

impl OtlpBackend {
    pub fn new(provider: &SdkMeterProvider) -> Self {
        Self {
            meter: provider.meter(METER_NAME),
        }
    }

    pub fn from_meter(meter: Meter) -> Self {
        Self { meter }
    }
}

impl MetricBackend for OtlpBackend {
    fn id(&self) -> BackendId {
        BackendId::OTLP
    }

    fn create(&self, descriptor: &MetricDescriptor) -> Result<Arc<dyn Instrument>, MetricsError> {
        let name = descriptor.name.clone();
        let description = descriptor.description.clone();
        let unit = descriptor.unit.clone();

        let kind = match descriptor.kind {
            MetricKind::Counter => OtlpKind::Counter(
                self.meter
                    .f64_counter(name)
                    .with_description(description)
                    .with_unit(unit)
                    .build(),
            ),
            MetricKind::Histogram => OtlpKind::Histogram(
                self.meter
                    .f64_histogram(name)
                    .with_description(description)
                    .with_unit(unit)
                    .with_boundaries(descriptor.buckets.clone())
                    .build(),
            ),
            MetricKind::Gauge => OtlpKind::UpDown(
                self.meter
                    .f64_up_down_counter(name)
                    .with_description(description)
                    .with_unit(unit)
                    .build(),
            ),
        };

        let out: Arc<dyn Instrument> = Arc::new(OtlpInstrument {
            descriptor: descriptor.clone(),
            kind,
        });
        Ok(out)
    }
}

enum OtlpKind {
    Counter(Counter<f64>),
    Histogram(Histogram<f64>),
    UpDown(UpDownCounter<f64>),
}

struct OtlpInstrument {
    descriptor: MetricDescriptor,
    kind: OtlpKind,
}

fn attributes(labels: &Labels<'_>) -> Vec<KeyValue> {
    labels
        .iter()
        .map(|(k, v)| KeyValue::new(k.to_string(), v.to_string()))
        .collect()
}

impl Instrument for OtlpInstrument {
    fn descriptor(&self) -> &MetricDescriptor {
        &self.descriptor
    }

    fn add(&self, delta: f64, labels: &Labels<'_>) -> Result<(), MetricsError> {
        ensure_finite(&self.descriptor, delta)?;
        match &self.kind {
            OtlpKind::Counter(_) if delta < 0.0 => Err(MetricsError::InvalidValue {
                name: self.descriptor.name().to_string(),
                value: delta,
            }),
            OtlpKind::Counter(c) => {
                c.add(delta, &attributes(labels));
                Ok(())
            }
            OtlpKind::UpDown(u) => {
                u.add(delta, &attributes(labels));
                Ok(())
            }
            OtlpKind::Histogram(_) => Err(kind_mismatch(&self.descriptor, "add")),
        }
    }

    fn observe(&self, value: f64, labels: &Labels<'_>) -> Result<(), MetricsError> {
        ensure_finite(&self.descriptor, value)?;
        match &self.kind {
            OtlpKind::Histogram(h) => {
                h.record(value, &attributes(labels));
                Ok(())
            }
            _ => Err(kind_mismatch(&self.descriptor, "observe")),
        }
    }

    // Up-down counters only take deltas.
    fn set(&self, _value: f64, _labels: &Labels<'_>) -> Result<(), MetricsError> {
        Err(kind_mismatch(&self.descriptor, "set"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secsvc_core::metric;

    fn backend() -> OtlpBackend {
        let provider = SdkMeterProvider::builder().build();
        OtlpBackend::new(&provider)
    }

    #[test]
    fn records_all_kinds() {
        let b = backend();
        let labels = [("method", "GET"), ("path", "/health"), ("status", "200")];

        let counter = b.create(&metric::http_requests_total()).unwrap();
        assert!(counter.add(1.0, &labels).is_ok());

        let hist = b.create(&metric::http_request_duration()).unwrap();
        assert!(hist.observe(12.5, &labels).is_ok());

        let gauge = b.create(&metric::http_requests_in_flight()).unwrap();
        assert!(gauge.add(1.0, &[]).is_ok());
        assert!(gauge.add(-1.0, &[]).is_ok());
    }

    #[test]
    fn rejects_invalid_values() {
        let b = backend();
        let counter = b.create(&metric::http_requests_total()).unwrap();
        assert!(matches!(
            counter.add(-1.0, &[]),
            Err(MetricsError::InvalidValue { .. })
        ));
        let hist = b.create(&metric::http_request_duration()).unwrap();
        assert!(hist.observe(f64::INFINITY, &[]).is_err());
        let gauge = b.create(&metric::http_requests_in_flight()).unwrap();
        assert!(matches!(gauge.set(3.0, &[]), Err(MetricsError::KindMismatch { .. })));
    }

    #[test]
    fn disabled_config_builds_provider_without_exporter() {
        let cfg = OtlpSection {
            enabled: false,
            ..OtlpSection::default()
        };
        let (_provider, exporting) = init_meter_provider(&cfg);
        assert!(!exporting);
    }
}
