use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

use maha_core::error::OrchestratorError;
use maha_core::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/servers", get(list_servers))
        .route("/servers/{name}/stop", post(stop_server))
        .route("/servers/{name}/tools", get(list_tools))
        .route("/servers/{name}/tools/call", post(call_tool))
        .route("/servers/{name}/resources", get(list_resources))
        .route("/servers/{name}/resources/read", post(read_resource))
}

async fn list_servers(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, OrchestratorError> {
    let servers = state.mcp_manager.statuses().await;
    Ok(Json(serde_json::json!({ "servers": servers })))
}

async fn stop_server(
    State(state): State<AppState>,
    axum::extract::Path(name): axum::extract::Path<String>,
) -> Result<Json<serde_json::Value>, OrchestratorError> {
    state.mcp_manager.stop_server(&name).await?;
    Ok(Json(serde_json::json!({ "stopped": name })))
}

async fn list_tools(
    State(state): State<AppState>,
    axum::extract::Path(name): axum::extract::Path<String>,
) -> Result<Json<serde_json::Value>, OrchestratorError> {
    let tools = state.mcp_manager.list_tools(&name).await?;
    Ok(Json(serde_json::json!({ "tools": tools })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallToolRequest {
    tool: String,
    #[serde(default)]
    arguments: Value,
}

async fn call_tool(
    State(state): State<AppState>,
    axum::extract::Path(name): axum::extract::Path<String>,
    Json(body): Json<CallToolRequest>,
) -> Result<Json<serde_json::Value>, OrchestratorError> {
    let result = state
        .mcp_manager
        .call_tool(&name, &body.tool, body.arguments)
        .await?;
    Ok(Json(serde_json::json!({ "result": result })))
}

async fn list_resources(
    State(state): State<AppState>,
    axum::extract::Path(name): axum::extract::Path<String>,
) -> Result<Json<serde_json::Value>, OrchestratorError> {
    let resources = state.mcp_manager.list_resources(&name).await;
    Ok(Json(serde_json::json!({ "resources": resources })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadResourceRequest {
    uri: String,
}

async fn read_resource(
    State(state): State<AppState>,
    axum::extract::Path(name): axum::extract::Path<String>,
    Json(body): Json<ReadResourceRequest>,
) -> Result<Json<serde_json::Value>, OrchestratorError> {
    let contents = state.mcp_manager.read_resource(&name, &body.uri).await?;
    Ok(Json(serde_json::json!({ "contents": contents })))
}
