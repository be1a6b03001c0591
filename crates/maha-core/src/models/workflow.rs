//! Workflow definitions and execution records.
//!
//! A `WorkflowDefinition` is immutable after planning; one definition may be
//! executed many times, each run tracked by its own `WorkflowExecution`.
//! An execution's `step_results` always has exactly one entry per step, in
//! the same order — that invariant holds for the whole lifecycle.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    Sequential,
    Parallel,
    /// Not yet implemented as real predicate-skip semantics; runs as
    /// sequential. Kept distinct so plans can carry the intent.
    Conditional,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
            Self::Conditional => "conditional",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "parallel" => Self::Parallel,
            "conditional" => Self::Conditional,
            _ => Self::Sequential,
        }
    }
}

/// One planned step, bound to a single agent. Created by the planner and
/// never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStep {
    pub step_id: String,
    pub agent_name: String,
    pub agent_url: String,
    pub description: String,
    /// agent input field → workflow variable name (or literal value)
    #[serde(default)]
    pub input_mapping: BTreeMap<String, String>,
    /// agent output field → workflow variable name
    #[serde(default)]
    pub output_mapping: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDefinition {
    pub workflow_id: String,
    pub name: String,
    pub description: String,
    pub user_intent: String,
    pub steps: Vec<WorkflowStep>,
    pub execution_mode: ExecutionMode,
    pub estimated_duration_ms: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub variables: HashMap<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }
}

/// Per-step outcome of one execution. Exactly one exists per WorkflowStep
/// for the lifetime of the execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub step_id: String,
    pub status: StepStatus,
    pub input: Option<Value>,
    pub output: Option<Value>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Preserved even when the step completed via a synthetic fallback
    /// result — a consumer must check this to know the real call failed.
    pub error: Option<String>,
}

impl StepResult {
    pub fn pending(step_id: &str) -> Self {
        Self {
            step_id: step_id.to_string(),
            status: StepStatus::Pending,
            input: None,
            output: None,
            started_at: None,
            completed_at: None,
            error: None,
        }
    }
}

/// One concrete run of a workflow. Created at execution start, mutated only
/// by the step loop driving it, never reused.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowExecution {
    pub execution_id: String,
    pub workflow_id: String,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub input: Value,
    pub output: Option<Value>,
    pub error: Option<String>,
    pub step_results: Vec<StepResult>,
}

impl WorkflowExecution {
    pub fn new(execution_id: String, workflow: &WorkflowDefinition, input: Value) -> Self {
        Self {
            execution_id,
            workflow_id: workflow.workflow_id.clone(),
            status: ExecutionStatus::Pending,
            started_at: Utc::now(),
            completed_at: None,
            input,
            output: None,
            error: None,
            step_results: workflow
                .steps
                .iter()
                .map(|s| StepResult::pending(&s.step_id))
                .collect(),
        }
    }
}
