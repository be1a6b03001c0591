use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use maha_core::error::OrchestratorError;
use maha_core::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_agents))
        .route("/health", get(agents_health))
        .route("/rate", post(rate_agent))
}

/// Fresh discovery: every configured HTTP endpoint plus MCP agents.
async fn list_agents(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, OrchestratorError> {
    let agents = state.runner.discover_agents().await;
    Ok(Json(serde_json::json!({ "agents": agents })))
}

async fn agents_health(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, OrchestratorError> {
    let checks = collect_health(&state).await;
    Ok(Json(serde_json::json!({ "health": checks })))
}

async fn collect_health(state: &AppState) -> Vec<maha_core::models::agent::AgentHealth> {
    let mut checks = Vec::new();
    for endpoint in state.runner.endpoints() {
        checks.push(state.registry.health(endpoint).await);
    }
    checks
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RateAgentRequest {
    wallet: String,
    rating: u8,
}

async fn rate_agent(
    State(state): State<AppState>,
    Json(body): Json<RateAgentRequest>,
) -> Result<Json<serde_json::Value>, OrchestratorError> {
    let tx_hash = state.runner.submit_rating(&body.wallet, body.rating).await?;
    Ok(Json(serde_json::json!({ "txHash": tx_hash })))
}
