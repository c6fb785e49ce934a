//! secsvc gateway binary.
//!
//! Config path comes from `SECSVC_CONFIG` (default `secsvc.yaml`). The CRUD
//! and search API is mounted by embedding applications; this binary serves
//! the operational routes only.

use std::net::SocketAddr;
use std::process::ExitCode;
use std::time::Duration;

use axum::Router;

use secsvc_core::error::{Result, SecSvcError};
use secsvc_gateway::{app_state::AppState, config, logging, router};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("secsvc-gateway: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let path = std::env::var(config::CONFIG_PATH_ENV)
        .unwrap_or_else(|_| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::load(&path, |key| std::env::var(key).ok())?;
    logging::init(&cfg.logging)?;

    let listen: SocketAddr = cfg
        .gateway
        .listen
        .parse()
        .map_err(|e| SecSvcError::BadRequest(format!("gateway.listen: {e}")))?;
    let grace = Duration::from_millis(cfg.gateway.shutdown_grace_ms);

    let state = AppState::new(cfg);
    let app = router::build_router(state.clone(), Router::new());

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| SecSvcError::Internal(format!("bind {listen} failed: {e}")))?;
    tracing::info!(%listen, "secsvc-gateway starting");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state.clone(), grace))
        .await;

    state.telemetry().shutdown();
    served.map_err(|e| SecSvcError::Internal(format!("server failed: {e}")))
}

/// Resolves once a stop signal arrived and the drain window elapsed.
async fn shutdown_signal(state: AppState, grace: Duration) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    state.begin_draining();
    tracing::info!(
        grace_ms = grace.as_millis() as u64,
        in_flight = state.telemetry().in_flight(),
        "signal received, draining before shutdown"
    );
    tokio::time::sleep(grace).await;
}
