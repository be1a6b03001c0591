#![allow(dead_code)]

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use maha_core::mcp::adapter::McpAgentAdapter;
use maha_core::mcp::manager::McpManager;
use maha_core::planner::rules::PlannerRules;
use maha_core::planner::WorkflowPlanner;
use maha_core::registry::AgentRegistry;
use maha_core::runner::JobRunner;
use maha_core::settlement::NoopLedger;
use maha_core::store::{ExecutionStore, WorkflowStore};
use maha_core::workflow::{FailurePolicy, WorkflowManager};

pub type RunFn = fn(Value) -> Result<Value, u16>;

/// Serve a stub agent implementing the /meta + /run + /health contract on
/// an ephemeral port and return its base URL.
pub async fn spawn_agent(meta: Value, run: RunFn) -> String {
    let app = Router::new()
        .route("/meta", get(meta_handler))
        .route("/run", post(run_handler))
        .route("/health", get(health_handler))
        .with_state((meta, run));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn meta_handler(State((meta, _)): State<(Value, RunFn)>) -> Json<Value> {
    Json(meta)
}

async fn run_handler(
    State((_, run)): State<(Value, RunFn)>,
    Json(input): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    run(input)
        .map(Json)
        .map_err(|code| StatusCode::from_u16(code).unwrap())
}

async fn health_handler() -> Json<Value> {
    Json(json!({"status": "healthy"}))
}

pub fn agent_meta(name: &str, input_schema: Value, output_schema: Value) -> Value {
    json!({
        "name": name,
        "description": format!("{name} stub"),
        "wallet": "0x0000000000000000000000000000000000000001",
        "inputSchema": input_schema,
        "outputSchema": output_schema,
    })
}

pub fn make_runner(endpoints: Vec<String>) -> Arc<JobRunner> {
    let registry = Arc::new(AgentRegistry::new());
    let mcp_manager = Arc::new(McpManager::new());
    let adapter = Arc::new(McpAgentAdapter::new(mcp_manager));
    Arc::new(JobRunner::new(
        registry,
        adapter,
        Arc::new(NoopLedger),
        endpoints,
        1,
    ))
}

pub struct TestHarness {
    pub runner: Arc<JobRunner>,
    pub manager: WorkflowManager,
    pub workflows: Arc<WorkflowStore>,
    pub executions: Arc<ExecutionStore>,
}

pub fn make_harness(endpoints: Vec<String>, policy: FailurePolicy) -> TestHarness {
    let runner = make_runner(endpoints);
    let planner = Arc::new(WorkflowPlanner::new(None, PlannerRules::default()));
    let workflows = Arc::new(WorkflowStore::new());
    let executions = Arc::new(ExecutionStore::new());
    let manager = WorkflowManager::new(
        planner,
        runner.clone(),
        None,
        workflows.clone(),
        executions.clone(),
        policy,
    );
    TestHarness {
        runner,
        manager,
        workflows,
        executions,
    }
}
