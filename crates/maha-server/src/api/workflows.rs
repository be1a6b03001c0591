use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

use maha_core::error::OrchestratorError;
use maha_core::models::workflow::WorkflowDefinition;
use maha_core::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_workflows).post(create_workflow))
        .route("/{id}", get(get_workflow))
        .route("/{id}/execute", post(execute_workflow))
}

async fn list_workflows(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, OrchestratorError> {
    let workflows = state.workflow_manager.list_workflows().await;
    Ok(Json(serde_json::json!({ "workflows": workflows })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateWorkflowRequest {
    user_intent: String,
    #[serde(default)]
    context: Option<Value>,
}

async fn create_workflow(
    State(state): State<AppState>,
    Json(body): Json<CreateWorkflowRequest>,
) -> Result<Json<serde_json::Value>, OrchestratorError> {
    if body.user_intent.trim().is_empty() {
        return Err(OrchestratorError::BadRequest(
            "userIntent must not be empty".to_string(),
        ));
    }
    let workflow = state
        .workflow_manager
        .create_workflow(
            &body.user_intent,
            body.context.unwrap_or(Value::Object(Default::default())),
        )
        .await?;
    Ok(Json(serde_json::json!({ "workflow": workflow })))
}

async fn get_workflow(
    State(state): State<AppState>,
    axum::extract::Path(id): axum::extract::Path<String>,
) -> Result<Json<WorkflowDefinition>, OrchestratorError> {
    state
        .workflow_manager
        .get_workflow(&id)
        .await
        .map(Json)
        .ok_or(OrchestratorError::WorkflowNotFound(id))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteWorkflowRequest {
    #[serde(default)]
    input: Option<Value>,
}

async fn execute_workflow(
    State(state): State<AppState>,
    axum::extract::Path(id): axum::extract::Path<String>,
    body: Option<Json<ExecuteWorkflowRequest>>,
) -> Result<Json<serde_json::Value>, OrchestratorError> {
    let input = body.and_then(|Json(b)| b.input);
    let execution = state.workflow_manager.execute_workflow(&id, input).await?;
    Ok(Json(serde_json::json!({ "execution": execution })))
}
