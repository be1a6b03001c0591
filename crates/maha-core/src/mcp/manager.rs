//! McpManager — lifecycle and call API for all configured MCP servers.
//!
//! State machine per server: `starting → running → {stopped | error}`.
//! The registry and each process's pending-request table are the shared
//! mutable state of the MCP layer; both live behind async locks.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::OrchestratorError;
use crate::mcp::process::{McpProcess, McpTimeouts};
use crate::mcp::McpServerConfig;
use crate::models::agent::McpToolInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum McpServerStatus {
    Starting,
    Running,
    Stopped,
    Error,
}

struct McpServer {
    config: McpServerConfig,
    status: McpServerStatus,
    process: Option<Arc<McpProcess>>,
    error: Option<String>,
    started_at: chrono::DateTime<chrono::Utc>,
}

/// Serializable status snapshot of one server.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct McpServerView {
    pub name: String,
    pub status: McpServerStatus,
    pub command: String,
    pub error: Option<String>,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

pub struct McpManager {
    servers: RwLock<HashMap<String, McpServer>>,
    timeouts: McpTimeouts,
}

impl McpManager {
    pub fn new() -> Self {
        Self::with_timeouts(McpTimeouts::default())
    }

    pub fn with_timeouts(timeouts: McpTimeouts) -> Self {
        Self {
            servers: RwLock::new(HashMap::new()),
            timeouts,
        }
    }

    /// Start every configured server. Individual failures are recorded in
    /// the registry and do not abort the batch.
    pub async fn start_servers(&self, configs: &HashMap<String, McpServerConfig>) {
        for (name, config) in configs {
            if let Err(e) = self.start_server(name, config.clone()).await {
                tracing::error!("[mcp] failed to start {}: {}", name, e);
            }
        }
    }

    /// Spawn one server, run the (best-effort) initialize handshake and mark
    /// it running. A spawn failure leaves the entry in `Error`.
    pub async fn start_server(
        &self,
        name: &str,
        config: McpServerConfig,
    ) -> Result<(), OrchestratorError> {
        {
            let mut servers = self.servers.write().await;
            servers.insert(
                name.to_string(),
                McpServer {
                    config: config.clone(),
                    status: McpServerStatus::Starting,
                    process: None,
                    error: None,
                    started_at: chrono::Utc::now(),
                },
            );
        }

        match McpProcess::spawn(name, &config, self.timeouts).await {
            Ok(process) => {
                let process = Arc::new(process);
                // Handshake timeout is soft; only hard pipe failures surface.
                if let Err(e) = process.initialize().await {
                    tracing::warn!("[mcp:{}] initialize failed: {}", name, e);
                }
                let mut servers = self.servers.write().await;
                if let Some(server) = servers.get_mut(name) {
                    server.status = McpServerStatus::Running;
                    server.process = Some(process);
                }
                tracing::info!("[mcp:{}] running", name);
                Ok(())
            }
            Err(e) => {
                let mut servers = self.servers.write().await;
                if let Some(server) = servers.get_mut(name) {
                    server.status = McpServerStatus::Error;
                    server.error = Some(e.to_string());
                }
                Err(e)
            }
        }
    }

    async fn running_process(&self, name: &str) -> Result<Arc<McpProcess>, OrchestratorError> {
        let servers = self.servers.read().await;
        let server = servers
            .get(name)
            .ok_or_else(|| OrchestratorError::McpServerUnavailable(format!("{name} not found")))?;
        if server.status != McpServerStatus::Running {
            return Err(OrchestratorError::McpServerUnavailable(format!(
                "{name} is {:?}",
                server.status
            )));
        }
        server
            .process
            .clone()
            .ok_or_else(|| OrchestratorError::McpServerUnavailable(format!("{name} has no process")))
    }

    /// List the tools a running server exposes.
    pub async fn list_tools(&self, name: &str) -> Result<Vec<McpToolInfo>, OrchestratorError> {
        let process = self.running_process(name).await?;
        let result = process.request("tools/list", serde_json::json!({})).await?;
        let tools = result
            .get("tools")
            .cloned()
            .map(|t| serde_json::from_value(t).unwrap_or_default())
            .unwrap_or_default();
        Ok(tools)
    }

    /// List resources. Optional per the protocol — failures yield an empty list.
    pub async fn list_resources(&self, name: &str) -> Vec<Value> {
        let Ok(process) = self.running_process(name).await else {
            return Vec::new();
        };
        match process.request("resources/list", serde_json::json!({})).await {
            Ok(result) => result
                .get("resources")
                .and_then(|r| r.as_array())
                .cloned()
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }

    /// Execute `tools/call`. A tool-level failure comes back as a structured
    /// `{isError: true, content: [...]}` payload rather than an error, so one
    /// failing tool call cannot crash the adapter layer. Transport failures
    /// (server down) still propagate.
    pub async fn call_tool(
        &self,
        server: &str,
        tool: &str,
        arguments: Value,
    ) -> Result<Value, OrchestratorError> {
        let process = self.running_process(server).await?;
        tracing::debug!("[mcp:{}] tools/call {}", server, tool);
        match process
            .request(
                "tools/call",
                serde_json::json!({"name": tool, "arguments": arguments}),
            )
            .await
        {
            Ok(result) => Ok(result),
            Err(e @ OrchestratorError::McpRequestTimeout { .. }) => Err(e),
            Err(e) if !process.is_alive() => Err(e),
            Err(e) => Ok(serde_json::json!({
                "isError": true,
                "content": [{"type": "text", "text": format!("Error executing {tool}: {e}")}],
            })),
        }
    }

    /// Execute `resources/read`. Errors propagate to the caller.
    pub async fn read_resource(&self, server: &str, uri: &str) -> Result<Value, OrchestratorError> {
        let process = self.running_process(server).await?;
        process
            .request("resources/read", serde_json::json!({"uri": uri}))
            .await
    }

    /// Names of all servers currently in `Running` state.
    pub async fn running_servers(&self) -> Vec<String> {
        let servers = self.servers.read().await;
        servers
            .iter()
            .filter(|(_, s)| s.status == McpServerStatus::Running)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub async fn statuses(&self) -> Vec<McpServerView> {
        let servers = self.servers.read().await;
        servers
            .iter()
            .map(|(name, s)| McpServerView {
                name: name.clone(),
                status: s.status,
                command: s.config.command.clone(),
                error: s.error.clone(),
                started_at: s.started_at,
            })
            .collect()
    }

    /// Stop one server: SIGTERM, grace period, SIGKILL.
    pub async fn stop_server(&self, name: &str) -> Result<(), OrchestratorError> {
        let process = {
            let mut servers = self.servers.write().await;
            let server = servers.get_mut(name).ok_or_else(|| {
                OrchestratorError::McpServerUnavailable(format!("{name} not found"))
            })?;
            server.status = McpServerStatus::Stopped;
            server.process.take()
        };
        if let Some(process) = process {
            process.shutdown().await;
        }
        tracing::info!("[mcp:{}] stopped", name);
        Ok(())
    }

    /// Tear down every live server. Called on orchestrator shutdown.
    pub async fn shutdown_all(&self) {
        let names: Vec<String> = self.servers.read().await.keys().cloned().collect();
        for name in names {
            if let Err(e) = self.stop_server(&name).await {
                tracing::warn!("[mcp] error stopping {}: {}", name, e);
            }
        }
    }
}

impl Default for McpManager {
    fn default() -> Self {
        Self::new()
    }
}
