//! Tracing subscriber setup.
//!
//! `RUST_LOG` wins over `logging.filter` when set.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use secsvc_core::error::{Result, SecSvcError};

use crate::config::{LogFormat, LoggingSection};

pub fn init(cfg: &LoggingSection) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.filter))
        .map_err(|e| SecSvcError::BadRequest(format!("invalid logging.filter: {e}")))?;

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match cfg.format {
        LogFormat::Text => registry.with(fmt::layer().with_target(true)).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    };

    installed.map_err(|e| SecSvcError::Internal(format!("failed to init tracing: {e}")))
}
