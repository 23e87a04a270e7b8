//! HTTP server for the review service.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::cors::CorsLayer;
use tracing::warn;

use super::handlers::{self, AppState};
use crate::config::RemoteConfig;
use crate::review::service::ReviewService;

/// Configuration for the review server.
pub struct ServerConfig {
    pub port: u16,
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            bind: "127.0.0.1".to_string(),
        }
    }
}

/// Build the full application router.
///
/// Browser clients call the API from arbitrary origins, so CORS stays open.
pub fn build_router(state: Arc<AppState>) -> Router {
    handlers::api_router()
        .fallback(handlers::fallback_handler)
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Start the review server.
pub async fn start_server(config: ServerConfig, remote: RemoteConfig) -> Result<()> {
    for warning in remote.validation_warnings() {
        warn!(%warning, "configuration warning");
    }

    let service =
        ReviewService::new(&remote).context("Failed to build the remote review client")?;
    let state = Arc::new(AppState { service });
    let app = build_router(state);

    let addr = format!("{}:{}", config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    println!("reviewd running at http://{}", local_addr);
    println!("POST http://{}/api/reviews", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    println!("Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    println!("\nShutting down...");
}
