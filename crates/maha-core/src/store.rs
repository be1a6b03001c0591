//! In-memory workflow and execution stores.
//!
//! Persistence across restarts is out of scope, so these are keyed maps
//! behind async RwLocks, owned by `AppState` and injected into the
//! components that need them — never ambient global state. Concurrently
//! running executions read and write them freely.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::models::workflow::{WorkflowDefinition, WorkflowExecution};

#[derive(Default)]
pub struct WorkflowStore {
    inner: RwLock<HashMap<String, WorkflowDefinition>>,
}

impl WorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, workflow: WorkflowDefinition) {
        self.inner
            .write()
            .await
            .insert(workflow.workflow_id.clone(), workflow);
    }

    pub async fn get(&self, workflow_id: &str) -> Option<WorkflowDefinition> {
        self.inner.read().await.get(workflow_id).cloned()
    }

    pub async fn list(&self) -> Vec<WorkflowDefinition> {
        let mut all: Vec<_> = self.inner.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        all
    }
}

#[derive(Default)]
pub struct ExecutionStore {
    inner: RwLock<HashMap<String, WorkflowExecution>>,
}

impl ExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert a snapshot. The step loop calls this at every status
    /// transition so observers see progress mid-flight.
    pub async fn put(&self, execution: WorkflowExecution) {
        self.inner
            .write()
            .await
            .insert(execution.execution_id.clone(), execution);
    }

    pub async fn get(&self, execution_id: &str) -> Option<WorkflowExecution> {
        self.inner.read().await.get(execution_id).cloned()
    }

    pub async fn list(&self) -> Vec<WorkflowExecution> {
        let mut all: Vec<_> = self.inner.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        all
    }
}
