//! MCP (Model Context Protocol) integration.
//!
//! Three layers:
//! - [`process`] — one managed subprocess with JSON-RPC 2.0 over stdio
//! - [`manager`] — the server registry and lifecycle state machine
//! - [`adapter`] — wraps each server's tool list into an `AgentDescriptor`
//!   so MCP tools look like ordinary agents to the planner and executor

pub mod adapter;
pub mod manager;
pub mod process;

pub use adapter::McpAgentAdapter;
pub use manager::{McpManager, McpServerStatus, McpServerView};
pub use process::{McpProcess, McpTimeouts};

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Spawn configuration for one MCP server, keyed by server name in the
/// orchestrator config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpServerConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}
