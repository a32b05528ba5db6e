//! HTTP server for LIDCO
//!
//! # Module Structure
//!
//! - `routes`: JSON and SSE handlers over a shared [`Session`]
//!
//! One server process serves one project session; chat turns from
//! different requests are serialized by the session.

mod routes;

#[cfg(test)]
mod tests;

pub use routes::{api_router, AppState};

use anyhow::{Context, Result};
use lidco_core::Session;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

/// Full application router with layers
pub fn app(session: Arc<Session>) -> axum::Router {
    api_router(AppState { session })
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn shutdown_signal(session: Arc<Session>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
    session.cancel();
}

/// Serve until Ctrl-C
pub async fn run(session: Arc<Session>, host: &str, port: u16) -> Result<()> {
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .context("Invalid server address")?;

    let app = app(session.clone());
    info!(
        project = %session.project_dir().display(),
        "HTTP server listening on http://{}", addr
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(session))
        .await
        .context("HTTP server error")?;

    info!("LIDCO shutdown complete");
    Ok(())
}
