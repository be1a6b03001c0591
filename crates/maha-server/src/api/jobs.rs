use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::Value;

use maha_core::error::OrchestratorError;
use maha_core::models::job::JobConfig;
use maha_core::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(run_job))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunJobRequest {
    #[serde(default)]
    job_id: Option<String>,
    job_data: Value,
    agent_urls: Vec<String>,
    payment_per_task: u64,
}

/// Run the full paid pipeline: escrow, sequential agent chain, fee,
/// completion. Unlike workflow execution, any agent failure fails the job.
async fn run_job(
    State(state): State<AppState>,
    Json(body): Json<RunJobRequest>,
) -> Result<Json<serde_json::Value>, OrchestratorError> {
    if body.agent_urls.is_empty() {
        return Err(OrchestratorError::BadRequest(
            "agentUrls must not be empty".to_string(),
        ));
    }
    let config = JobConfig {
        job_id: body
            .job_id
            .unwrap_or_else(|| format!("job_{}", uuid::Uuid::new_v4().simple())),
        job_data: body.job_data,
        agent_urls: body.agent_urls,
        payment_per_task: body.payment_per_task,
    };
    let result = state.runner.run_job(&config).await?;
    Ok(Json(serde_json::json!({ "job": result })))
}
