//! HTTP surface: `GET /` and `POST /upscale`
//!
//! The router owns nothing but an `Arc` to the processor. Engine loading
//! happens once in the binary before `serve` is called; a failed load still
//! starts the server so that `/upscale` can answer with a not-ready error.

pub mod error;
pub mod multipart;
pub mod routes;

pub use error::ApiError;

use crate::{config::ServerConfig, processor::UpscaleProcessor};
use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    pub processor: Arc<UpscaleProcessor>,
}

impl AppState {
    #[must_use]
    pub fn new(processor: UpscaleProcessor) -> Self {
        Self {
            processor: Arc::new(processor),
        }
    }
}

/// Build the service router
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(routes::health))
        .route("/upscale", post(routes::upscale))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

/// Bind and serve until Ctrl+C or SIGTERM
///
/// # Errors
/// - The listener cannot bind to `host:port`
/// - The server fails while running
pub async fn serve(config: &ServerConfig, state: AppState) -> anyhow::Result<()> {
    let address = config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind to {address}"))?;
    let local = listener
        .local_addr()
        .context("Failed to read listener address")?;

    if state.processor.is_ready() {
        info!(address = %local, "🚀 Upscale API listening");
    } else {
        warn!(address = %local, "Upscale API listening without models; /upscale will fail");
    }

    axum::serve(listener, router(state, config.max_upload_bytes))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
