//! Gateway config loader (strict parsing).

pub mod schema;

use std::fs;
use std::path::Path;

use secsvc_core::error::{Result, SecSvcError};

pub use schema::{GatewayConfig, GatewaySection, LogFormat, LoggingSection, MetricsSection, OtlpSection};

/// Env var naming the config file.
pub const CONFIG_PATH_ENV: &str = "SECSVC_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "secsvc.yaml";

pub fn load_from_str(s: &str) -> Result<GatewayConfig> {
    let cfg = parse(s)?;
    cfg.validate()?;
    Ok(cfg)
}

fn parse(s: &str) -> Result<GatewayConfig> {
    serde_yaml::from_str(s).map_err(|e| SecSvcError::BadRequest(format!("invalid yaml: {e}")))
}

/// Startup loading: read the file at `path` if it exists (defaults
/// otherwise), apply env overrides from `lookup`, then validate.
pub fn load<F>(path: &str, lookup: F) -> Result<GatewayConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut cfg = if Path::new(path).exists() {
        let s = fs::read_to_string(path)
            .map_err(|e| SecSvcError::Internal(format!("read config failed: {e}")))?;
        parse(&s)?
    } else {
        tracing::info!(path, "config file not found, using defaults");
        GatewayConfig::default()
    };

    cfg.apply_overrides(lookup);
    cfg.validate()?;
    Ok(cfg)
}
