use axum::{extract::State, routing::get, Json, Router};

use maha_core::error::OrchestratorError;
use maha_core::models::workflow::WorkflowExecution;
use maha_core::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_executions))
        .route("/{id}", get(get_execution))
}

async fn list_executions(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, OrchestratorError> {
    let executions = state.workflow_manager.list_executions().await;
    Ok(Json(serde_json::json!({ "executions": executions })))
}

async fn get_execution(
    State(state): State<AppState>,
    axum::extract::Path(id): axum::extract::Path<String>,
) -> Result<Json<WorkflowExecution>, OrchestratorError> {
    state
        .workflow_manager
        .get_execution(&id)
        .await
        .map(Json)
        .ok_or(OrchestratorError::ExecutionNotFound(id))
}
