//! HTTP gateway server.

use anyhow::{Context, Result};
use axum::{extract::State, routing::get, Json, Router};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use contentindex::{JsonIndex, MetadataIndex};
use unlockconf::UnlockConfig;

use crate::storage::HttpStorageGateway;
use crate::summarize;
use crate::web::{self, WebState};

/// Server state for health endpoint
#[derive(Clone)]
pub struct HealthState {
    pub index_path: PathBuf,
    pub start_time: Instant,
}

/// Health check endpoint
pub async fn handle_health(State(state): State<HealthState>) -> Json<serde_json::Value> {
    let uptime = state.start_time.elapsed();

    Json(serde_json::json!({
        "status": "healthy",
        "uptime_secs": uptime.as_secs(),
        "version": env!("CARGO_PKG_VERSION"),
        "index_path": state.index_path.display().to_string(),
    }))
}

/// Build the full application: API routes, health, tracing and CORS.
pub fn app(state: WebState, health: HealthState) -> Router {
    let health_router = Router::new()
        .route("/health", get(handle_health))
        .with_state(health);

    web::router(state)
        .merge(health_router)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Run the gateway until SIGINT/SIGTERM.
pub async fn run(config: UnlockConfig) -> Result<()> {
    info!("🔓 unlockd starting");

    let index = Arc::new(JsonIndex::at_path(&config.infra.paths.index_file));
    index
        .try_initialize()
        .with_context(|| format!("Failed to initialize index at {}", index.path().display()))?;
    info!("   Index: {}", index.path().display());
    info!("   Records: {}", index.read_all().len());

    let storage = HttpStorageGateway::new(&config.services.storage)
        .context("Failed to build storage client")?;
    info!("   Storage relay: {}", storage.base_url());

    let summarizer = summarize::from_config(&config.services.summarizer)
        .context("Failed to build summarizer client")?;
    if config.services.summarizer.enabled() {
        info!(
            "   Summarizer: {} ({})",
            config.services.summarizer.base_url, config.services.summarizer.model
        );
    }

    let state = WebState::new(Arc::clone(&index), Arc::new(storage), summarizer);
    let health = HealthState {
        index_path: index.path().to_path_buf(),
        start_time: Instant::now(),
    };

    let addr = config.infra.bind.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("🔓 unlockd ready!");
    info!("   Upload: POST http://{}/api/send", addr);
    info!("   Content: GET http://{}/api/content/{{rootHash}}", addr);
    info!("   Tools: GET http://{}/api/agent/tools", addr);
    info!("   Health: GET http://{}/health", addr);

    axum::serve(listener, app(state, health))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received SIGINT, shutting down...");
        }
        _ = terminate() => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            tracing::warn!("Failed to install SIGTERM handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
