//! McpProcess — one MCP server child process with JSON-RPC 2.0 over stdio.
//!
//! The lifecycle:
//!   1. `spawn(command, args, env)` — start the child, launch a background
//!      stdout reader
//!   2. `initialize()` — send the MCP handshake; a handshake timeout does NOT
//!      fail startup (non-conformant servers are tolerated)
//!   3. `request(method, params)` — correlated request/response by integer id
//!   4. `shutdown()` — SIGTERM, then SIGKILL after the grace period
//!
//! The stdout reader is the single owner of the demultiplexing path: it
//! splits the byte stream into newline-delimited JSON frames and resolves
//! the matching pending waiter by response id, independent of arrival order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin};
use tokio::sync::{oneshot, Mutex};

use crate::error::OrchestratorError;
use crate::mcp::McpServerConfig;

pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Timeouts for the protocol phases. Tests shrink these; production uses the
/// defaults from the wire contract.
#[derive(Debug, Clone, Copy)]
pub struct McpTimeouts {
    /// `initialize` handshake. Soft — expiry still marks the server running.
    pub handshake: Duration,
    /// Any other request. Hard — expiry fails with `McpRequestTimeout`.
    pub request: Duration,
    /// Grace period between SIGTERM and SIGKILL on shutdown.
    pub shutdown_grace: Duration,
}

impl Default for McpTimeouts {
    fn default() -> Self {
        Self {
            handshake: Duration::from_secs(5),
            request: Duration::from_secs(10),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, OrchestratorError>>>>>;

/// A managed MCP server child process.
pub struct McpProcess {
    server_name: String,
    stdin: Arc<Mutex<ChildStdin>>,
    child: Arc<Mutex<Option<Child>>>,
    pid: Option<u32>,
    pending: PendingMap,
    next_id: AtomicU64,
    alive: Arc<AtomicBool>,
    timeouts: McpTimeouts,
    _reader_handle: tokio::task::JoinHandle<()>,
}

impl McpProcess {
    /// Spawn the server process and start the background stdout reader.
    pub async fn spawn(
        server_name: &str,
        config: &McpServerConfig,
        timeouts: McpTimeouts,
    ) -> Result<Self, OrchestratorError> {
        tracing::info!(
            "[mcp:{}] spawning: {} {}",
            server_name,
            config.command,
            config.args.join(" ")
        );

        let mut child = tokio::process::Command::new(&config.command)
            .args(&config.args)
            .envs(&config.env)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| {
                OrchestratorError::McpServerUnavailable(format!(
                    "failed to spawn '{}' for {}: {}",
                    config.command, server_name, e
                ))
            })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            OrchestratorError::McpServerUnavailable(format!("{server_name}: no stdin on child"))
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            OrchestratorError::McpServerUnavailable(format!("{server_name}: no stdout on child"))
        })?;
        let stderr = child.stderr.take();

        let pid = child.id();
        let alive = Arc::new(AtomicBool::new(true));
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

        // Drain stderr so the child never blocks on a full pipe.
        if let Some(stderr) = stderr {
            let name = server_name.to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if !line.trim().is_empty() {
                        tracing::debug!("[mcp:{} stderr] {}", name, line);
                    }
                }
            });
        }

        let reader_handle = tokio::spawn(reader_loop(
            server_name.to_string(),
            stdout,
            pending.clone(),
            alive.clone(),
        ));

        Ok(Self {
            server_name: server_name.to_string(),
            stdin: Arc::new(Mutex::new(stdin)),
            child: Arc::new(Mutex::new(Some(child))),
            pid,
            pending,
            next_id: AtomicU64::new(1),
            alive,
            timeouts,
            _reader_handle: reader_handle,
        })
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// Send a JSON-RPC request and wait for the correlated response.
    ///
    /// The id is allocated from a monotonically increasing counter, so no two
    /// concurrently pending requests to this server ever share one.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value, OrchestratorError> {
        self.request_with_timeout(method, params, self.timeouts.request)
            .await
    }

    async fn request_with_timeout(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, OrchestratorError> {
        if !self.is_alive() {
            return Err(OrchestratorError::McpServerUnavailable(format!(
                "{} is not running",
                self.server_name
            )));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let msg = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let data = format!("{}\n", msg);

        {
            let mut stdin = self.stdin.lock().await;
            let write = async {
                stdin.write_all(data.as_bytes()).await?;
                stdin.flush().await
            };
            if let Err(e) = write.await {
                self.pending.lock().await.remove(&id);
                return Err(OrchestratorError::McpServerUnavailable(format!(
                    "{}: write {} failed: {}",
                    self.server_name, method, e
                )));
            }
        }
        tracing::debug!("[mcp:{}] sent {} (id={})", self.server_name, method, id);

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(OrchestratorError::McpServerUnavailable(format!(
                "{}: channel closed for {} (id={})",
                self.server_name, method, id
            ))),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(OrchestratorError::McpRequestTimeout {
                    server: self.server_name.clone(),
                    method: method.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Perform the MCP `initialize` handshake.
    ///
    /// Best-effort: a handshake timeout is swallowed and the server is still
    /// treated as running, tolerating servers that never answer. Other
    /// failures (dead process, broken pipe) propagate.
    pub async fn initialize(&self) -> Result<(), OrchestratorError> {
        let params = serde_json::json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "maha-orchestrator",
                "version": env!("CARGO_PKG_VERSION"),
            },
        });

        match self
            .request_with_timeout("initialize", params, self.timeouts.handshake)
            .await
        {
            Ok(result) => {
                tracing::info!("[mcp:{}] initialized: {}", self.server_name, result);
                Ok(())
            }
            Err(OrchestratorError::McpRequestTimeout { .. }) => {
                tracing::warn!(
                    "[mcp:{}] initialize handshake timed out, continuing anyway",
                    self.server_name
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Terminate the process: SIGTERM first, SIGKILL after the grace period.
    /// All pending requests are rejected.
    pub async fn shutdown(&self) {
        self.alive.store(false, Ordering::SeqCst);

        let mut guard = self.child.lock().await;
        if let Some(mut child) = guard.take() {
            #[cfg(unix)]
            if let Some(pid) = self.pid {
                unsafe {
                    libc::kill(pid as i32, libc::SIGTERM);
                }
            }

            match tokio::time::timeout(self.timeouts.shutdown_grace, child.wait()).await {
                Ok(status) => {
                    tracing::info!("[mcp:{}] exited: {:?}", self.server_name, status.ok());
                }
                Err(_) => {
                    tracing::warn!(
                        "[mcp:{}] did not exit within grace period, killing",
                        self.server_name
                    );
                    let _ = child.kill().await;
                }
            }
        }
        drop(guard);

        let mut map = self.pending.lock().await;
        for (_, tx) in map.drain() {
            let _ = tx.send(Err(OrchestratorError::McpServerUnavailable(format!(
                "{} stopped",
                self.server_name
            ))));
        }
    }
}

/// The single stdout reader: splits the pipe into newline-delimited JSON
/// frames and dispatches each one.
async fn reader_loop(
    server_name: String,
    stdout: tokio::process::ChildStdout,
    pending: PendingMap,
    alive: Arc<AtomicBool>,
) {
    let mut lines = BufReader::new(stdout).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let msg: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(_) => {
                // Truncate on a char boundary; servers can emit arbitrary bytes.
                let preview: String = line.chars().take(200).collect();
                tracing::debug!("[mcp:{}] non-JSON stdout: {}", server_name, preview);
                continue;
            }
        };
        dispatch_frame(&server_name, &pending, msg).await;
    }

    alive.store(false, Ordering::SeqCst);
    tracing::info!("[mcp:{}] stdout reader finished", server_name);
}

/// Resolve a parsed frame against the pending-waiter table.
///
/// Responses are matched purely by id; frames with a `method` member are
/// server-initiated notifications/requests and are logged and dropped
/// (the orchestrator only ever acts as the requesting side).
async fn dispatch_frame(server_name: &str, pending: &PendingMap, msg: Value) {
    let id = msg.get("id").and_then(|v| v.as_u64());
    let has_result = msg.get("result").is_some();
    let has_error = msg.get("error").is_some();

    match id {
        Some(id) if has_result || has_error => {
            let mut map = pending.lock().await;
            if let Some(tx) = map.remove(&id) {
                if has_error {
                    let message = msg["error"]["message"]
                        .as_str()
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| msg["error"].to_string());
                    let _ = tx.send(Err(OrchestratorError::McpServerUnavailable(format!(
                        "{server_name}: rpc error: {message}"
                    ))));
                } else {
                    let _ = tx.send(Ok(msg["result"].clone()));
                }
            } else {
                tracing::debug!("[mcp:{}] response for unknown id {}", server_name, id);
            }
        }
        _ => {
            let method = msg.get("method").and_then(|m| m.as_str()).unwrap_or("?");
            tracing::debug!("[mcp:{}] ignoring server-initiated '{}'", server_name, method);
        }
    }
}
