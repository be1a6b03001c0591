//! MAHA Server - Multi-Agent orchestration HTTP backend
//!
//! A standalone axum server on top of maha-core, providing:
//! - workflow planning and execution over a RESTful HTTP API
//! - agent discovery, health and rating endpoints
//! - MCP server lifecycle management and tool invocation
//! - the paid job-runner pipeline
//!
//! The server can be embedded (via [`start_server_with_state`]) or run
//! standalone through the binary in `main.rs`.

pub mod api;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use maha_core::config::OrchestratorConfig;
use maha_core::state::{AppState, AppStateInner};

/// Create a shared `AppState` from a loaded config and start the
/// configured MCP servers.
pub async fn create_app_state(config: OrchestratorConfig) -> AppState {
    let state: AppState = Arc::new(AppStateInner::new(config));
    state
        .mcp_manager
        .start_servers(&state.config.mcp_servers)
        .await;
    state
}

/// Build the complete application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api::api_router())
        .route("/health", axum::routing::get(health_check))
        .route("/api/health", axum::routing::get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve in a background task. Returns the bound address, which
/// matters when the config asks for port 0.
pub async fn start_server_with_state(state: AppState) -> Result<SocketAddr, String> {
    let addr = state.config.bind_addr.clone();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind to {addr}: {e}"))?;
    let local_addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get local address: {e}"))?;

    tracing::info!("MAHA orchestrator listening on {}", local_addr);

    let app = app(state);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok(local_addr)
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "server": "maha-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
