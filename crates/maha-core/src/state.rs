//! Shared application state for the axum server.

use std::sync::Arc;

use crate::config::OrchestratorConfig;
use crate::mcp::adapter::McpAgentAdapter;
use crate::mcp::manager::McpManager;
use crate::planner::llm::LlmClient;
use crate::planner::WorkflowPlanner;
use crate::registry::AgentRegistry;
use crate::runner::JobRunner;
use crate::settlement::{HttpLedger, NoopLedger, SettlementLedger};
use crate::store::{ExecutionStore, WorkflowStore};
use crate::workflow::{LlmTransformer, StepTransformer, WorkflowManager};

/// Shared state accessible by all API handlers.
pub struct AppStateInner {
    pub config: OrchestratorConfig,
    pub registry: Arc<AgentRegistry>,
    pub mcp_manager: Arc<McpManager>,
    pub runner: Arc<JobRunner>,
    pub workflow_manager: Arc<WorkflowManager>,
    pub workflow_store: Arc<WorkflowStore>,
    pub execution_store: Arc<ExecutionStore>,
}

pub type AppState = Arc<AppStateInner>;

impl AppStateInner {
    pub fn new(config: OrchestratorConfig) -> Self {
        let registry = Arc::new(AgentRegistry::new());
        let mcp_manager = Arc::new(McpManager::new());
        let adapter = Arc::new(McpAgentAdapter::new(mcp_manager.clone()));

        let settlement: Arc<dyn SettlementLedger> = match config.settlement.endpoint() {
            Some(url) => Arc::new(HttpLedger::new(url)),
            None => Arc::new(NoopLedger),
        };

        let runner = Arc::new(JobRunner::new(
            registry.clone(),
            adapter,
            settlement,
            config.agent_endpoints.clone(),
            config.orchestrator_fee,
        ));

        let backend = config
            .planner
            .clone()
            .map(|llm| Arc::new(LlmClient::new(llm)) as Arc<dyn crate::planner::llm::ChatBackend>);
        let transformer: Option<Arc<dyn StepTransformer>> = backend
            .clone()
            .map(|b| Arc::new(LlmTransformer::new(b)) as Arc<dyn StepTransformer>);
        let planner = Arc::new(WorkflowPlanner::new(backend, config.planner_rules.clone()));

        let workflow_store = Arc::new(WorkflowStore::new());
        let execution_store = Arc::new(ExecutionStore::new());
        let workflow_manager = Arc::new(WorkflowManager::new(
            planner,
            runner.clone(),
            transformer,
            workflow_store.clone(),
            execution_store.clone(),
            config.failure_policy,
        ));

        Self {
            config,
            registry,
            mcp_manager,
            runner,
            workflow_manager,
            workflow_store,
            execution_store,
        }
    }
}
