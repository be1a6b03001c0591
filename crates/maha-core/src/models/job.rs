//! Job runner types — the ad-hoc, non-persisted direct execution path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Configuration for a direct (non-planned) job: an ordered agent chain fed
/// output→input, with a flat per-task payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobConfig {
    pub job_id: String,
    pub job_data: Value,
    /// Agent URLs in execution order. `mcp://` URLs route to MCP servers.
    pub agent_urls: Vec<String>,
    /// Payment escrowed per task, in ledger base units.
    #[serde(default)]
    pub payment_per_task: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    pub agent_name: String,
    pub agent_url: String,
    pub result: Value,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub execution_time_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    pub job_id: String,
    pub results: Vec<TaskResult>,
}
