use serde::Deserialize;
use secsvc_core::error::{Result, SecSvcError};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub logging: LoggingSection,

    #[serde(default)]
    pub metrics: MetricsSection,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            version: 1,
            gateway: GatewaySection::default(),
            logging: LoggingSection::default(),
            metrics: MetricsSection::default(),
        }
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(SecSvcError::UnsupportedVersion);
        }

        self.gateway.validate()?;
        self.metrics.validate()?;

        Ok(())
    }

    /// Apply environment overrides. `lookup` is `std::env::var` in production.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("OTEL_EXPORTER_OTLP_ENDPOINT") {
            self.metrics.otlp.endpoint = v;
        }
        if let Some(v) = non_empty("OTEL_SERVICE_NAME") {
            self.metrics.otlp.service_name = v;
        }
        if let Some(v) = non_empty("OTEL_SERVICE_VERSION") {
            self.metrics.otlp.service_version = v;
        }
        if let Some(v) = non_empty("SECSVC_LISTEN") {
            self.gateway.listen = v;
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        if self.listen.parse::<std::net::SocketAddr>().is_err() {
            return Err(SecSvcError::BadRequest(format!(
                "gateway.listen must be a socket address, got {:?}",
                self.listen
            )));
        }
        if self.shutdown_grace_ms > 120000 {
            return Err(SecSvcError::BadRequest(
                "gateway.shutdown_grace_ms must be at most 120000".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8000".into()
}
fn default_shutdown_grace_ms() -> u64 {
    10000
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    #[serde(default)]
    pub format: LogFormat,

    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "info".into()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    #[serde(default = "default_exposition_path")]
    pub exposition_path: String,

    #[serde(default = "default_slow_request_ms")]
    pub slow_request_ms: u64,

    #[serde(default)]
    pub otlp: OtlpSection,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            exposition_path: default_exposition_path(),
            slow_request_ms: default_slow_request_ms(),
            otlp: OtlpSection::default(),
        }
    }
}

impl MetricsSection {
    pub fn validate(&self) -> Result<()> {
        if !self.exposition_path.starts_with('/') || self.exposition_path.len() < 2 {
            return Err(SecSvcError::BadRequest(
                "metrics.exposition_path must start with '/' and name a route".into(),
            ));
        }
        if self.exposition_path.contains([':', '*', '{', '}']) {
            return Err(SecSvcError::BadRequest(
                "metrics.exposition_path must be a literal path without captures or wildcards".into(),
            ));
        }
        if self.exposition_path.starts_with("/health/") {
            return Err(SecSvcError::BadRequest(
                "metrics.exposition_path must not shadow the /health routes".into(),
            ));
        }
        if !(1..=600000).contains(&self.slow_request_ms) {
            return Err(SecSvcError::BadRequest(
                "metrics.slow_request_ms must be between 1 and 600000".into(),
            ));
        }
        self.otlp.validate()
    }
}

fn default_exposition_path() -> String {
    "/metrics".into()
}
fn default_slow_request_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OtlpSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_otlp_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_service_name")]
    pub service_name: String,

    #[serde(default = "default_service_version")]
    pub service_version: String,

    #[serde(default = "default_export_interval_ms")]
    pub export_interval_ms: u64,
}

impl Default for OtlpSection {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_otlp_endpoint(),
            service_name: default_service_name(),
            service_version: default_service_version(),
            export_interval_ms: default_export_interval_ms(),
        }
    }
}

impl OtlpSection {
    pub fn validate(&self) -> Result<()> {
        if !(1000..=300000).contains(&self.export_interval_ms) {
            return Err(SecSvcError::BadRequest(
                "metrics.otlp.export_interval_ms must be between 1000 and 300000".into(),
            ));
        }
        if self.service_name.trim().is_empty() {
            return Err(SecSvcError::BadRequest(
                "metrics.otlp.service_name must not be empty".into(),
            ));
        }
        if self.enabled
            && !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://"))
        {
            return Err(SecSvcError::BadRequest(
                "metrics.otlp.endpoint must be an http(s) URL".into(),
            ));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}
fn default_otlp_endpoint() -> String {
    "http://localhost:4317".into()
}
fn default_service_name() -> String {
    "security-service".into()
}
fn default_service_version() -> String {
    "1.0.0".into()
}
fn default_export_interval_ms() -> u64 {
    5000
}
