//! Job runner: agent discovery, single-task execution, and paid jobs.
//!
//! The runner owns the dispatch seam between HTTP agents (via the
//! registry) and MCP agents (via the adapter), and wires every completed
//! task into the settlement ledger. Workflow execution reuses
//! `execute_agent_task` without payments; `run_job` is the paid path
//! where any failure is a hard error.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::OrchestratorError;
use crate::mcp::adapter::McpAgentAdapter;
use crate::models::agent::{is_mcp_url, AgentDescriptor};
use crate::models::job::{JobConfig, JobResult, TaskResult};
use crate::registry::AgentRegistry;
use crate::settlement::SettlementLedger;

pub struct JobRunner {
    registry: Arc<AgentRegistry>,
    adapter: Arc<McpAgentAdapter>,
    settlement: Arc<dyn SettlementLedger>,
    endpoints: Vec<String>,
    orchestrator_fee: u64,
    // Refreshed on discovery so per-step dispatch does not re-run
    // tools/list against every server.
    mcp_agents: RwLock<HashMap<String, AgentDescriptor>>,
}

impl JobRunner {
    pub fn new(
        registry: Arc<AgentRegistry>,
        adapter: Arc<McpAgentAdapter>,
        settlement: Arc<dyn SettlementLedger>,
        endpoints: Vec<String>,
        orchestrator_fee: u64,
    ) -> Self {
        Self {
            registry,
            adapter,
            settlement,
            endpoints,
            orchestrator_fee,
            mcp_agents: RwLock::new(HashMap::new()),
        }
    }

    /// Full agent census: every configured HTTP endpoint plus one
    /// synthetic agent per running MCP server. Unreachable HTTP agents
    /// are skipped with a warning rather than failing discovery.
    pub async fn discover_agents(&self) -> Vec<AgentDescriptor> {
        let mut agents = Vec::new();
        for endpoint in &self.endpoints {
            match self.registry.discover(endpoint).await {
                Ok(cached) => agents.push(cached.descriptor.clone()),
                Err(e) => warn!(endpoint, error = %e, "skipping unreachable agent"),
            }
        }

        let mcp = self.adapter.descriptors().await;
        {
            let mut cache = self.mcp_agents.write().await;
            cache.clear();
            for descriptor in &mcp {
                cache.insert(descriptor.url(), descriptor.clone());
            }
        }
        agents.extend(mcp);
        agents
    }

    /// Descriptor for a URL previously seen by discovery, HTTP or MCP.
    pub async fn descriptor_for_url(&self, url: &str) -> Option<AgentDescriptor> {
        if is_mcp_url(url) {
            return self.mcp_agents.read().await.get(url).cloned();
        }
        self.registry
            .discover(url)
            .await
            .ok()
            .map(|cached| cached.descriptor.clone())
    }

    /// Execute one task against an agent, HTTP or MCP, and feed the
    /// outcome into the reputation ledger. Ledger failures are logged,
    /// never surfaced.
    pub async fn execute_agent_task(
        &self,
        agent_url: &str,
        input: &Value,
    ) -> Result<Value, OrchestratorError> {
        let started = Instant::now();
        let result = self.dispatch(agent_url, input).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        if let Err(e) = self
            .settlement
            .record_task_completion(agent_url, result.is_ok(), latency_ms)
            .await
        {
            debug!(agent_url, error = %e, "reputation feed unavailable");
        }
        result
    }

    async fn dispatch(&self, agent_url: &str, input: &Value) -> Result<Value, OrchestratorError> {
        if is_mcp_url(agent_url) {
            let descriptor = self
                .mcp_agents
                .read()
                .await
                .get(agent_url)
                .cloned();
            let descriptor = match descriptor {
                Some(d) => d,
                None => {
                    // Not seen yet, refresh once before giving up.
                    self.discover_agents().await;
                    self.mcp_agents
                        .read()
                        .await
                        .get(agent_url)
                        .cloned()
                        .ok_or_else(|| {
                            OrchestratorError::AgentUnavailable(format!(
                                "unknown MCP agent {agent_url}"
                            ))
                        })?
                }
            };
            return self.adapter.run(&descriptor, input).await;
        }

        let cached = self.registry.discover(agent_url).await?;
        self.registry.execute(&cached, input).await
    }

    /// One paid task: execute, then pay the agent its per-task amount.
    pub async fn execute_task(
        &self,
        job_id: &str,
        agent_url: &str,
        input: &Value,
        payment: u64,
    ) -> Result<TaskResult, OrchestratorError> {
        let started = Instant::now();
        let output = self.execute_agent_task(agent_url, input).await?;
        let execution_time_ms = started.elapsed().as_millis() as u64;

        let wallet = self
            .descriptor_for_url(agent_url)
            .await
            .and_then(|d| d.wallet().map(str::to_string))
            .unwrap_or_else(|| agent_url.to_string());
        self.settlement
            .pay_agent(job_id, &wallet, payment, &output)
            .await?;

        let agent_name = self
            .descriptor_for_url(agent_url)
            .await
            .map(|d| d.name().to_string())
            .unwrap_or_else(|| agent_url.to_string());
        Ok(TaskResult {
            agent_name,
            agent_url: agent_url.to_string(),
            result: output,
            timestamp: chrono::Utc::now(),
            success: true,
            execution_time_ms,
        })
    }

    /// Run every task in order, feeding each output as the next input.
    /// Any failure aborts the chain.
    pub async fn execute_sequential_tasks(
        &self,
        job_id: &str,
        agent_urls: &[String],
        initial_input: &Value,
        payment_per_task: u64,
    ) -> Result<Vec<TaskResult>, OrchestratorError> {
        let mut results = Vec::with_capacity(agent_urls.len());
        let mut current = initial_input.clone();
        for url in agent_urls {
            let task = self
                .execute_task(job_id, url, &current, payment_per_task)
                .await?;
            current = task.result.clone();
            results.push(task);
        }
        Ok(results)
    }

    /// Run every task concurrently against the same input. Any failure
    /// fails the batch.
    pub async fn execute_parallel_tasks(
        &self,
        job_id: &str,
        agent_urls: &[String],
        input: &Value,
        payment_per_task: u64,
    ) -> Result<Vec<TaskResult>, OrchestratorError> {
        let futures = agent_urls
            .iter()
            .map(|url| self.execute_task(job_id, url, input, payment_per_task));
        futures::future::try_join_all(futures).await
    }

    /// The full paid lifecycle: escrow, sequential chain, orchestrator
    /// fee, completion with flat five-star ratings. Unlike workflow
    /// execution there is no fallback here; a failed agent fails the job.
    pub async fn run_job(&self, config: &JobConfig) -> Result<JobResult, OrchestratorError> {
        let input_hash = format!("{:x}", input_fingerprint(&config.job_data));
        self.settlement
            .create_task(
                &config.job_id,
                config.agent_urls.first().map(String::as_str).unwrap_or(""),
                &input_hash,
                3600,
                config.payment_per_task * config.agent_urls.len() as u64,
            )
            .await?;

        let results = self
            .execute_sequential_tasks(
                &config.job_id,
                &config.agent_urls,
                &config.job_data,
                config.payment_per_task,
            )
            .await?;

        self.settlement
            .pay_orchestrator(&config.job_id, self.orchestrator_fee)
            .await?;

        let agents: Vec<String> = results.iter().map(|r| r.agent_url.clone()).collect();
        let ratings = vec![5u8; agents.len()];
        self.settlement
            .complete_job(&config.job_id, &agents, &ratings)
            .await?;

        Ok(JobResult {
            job_id: config.job_id.clone(),
            results,
        })
    }

    /// Manual rating submission; ratings are 1..=5 stars.
    pub async fn submit_rating(
        &self,
        wallet: &str,
        rating: u8,
    ) -> Result<String, OrchestratorError> {
        if !(1..=5).contains(&rating) {
            return Err(OrchestratorError::BadRequest(format!(
                "rating must be between 1 and 5, got {rating}"
            )));
        }
        self.settlement.rate_agent(wallet, rating).await
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }
}

// Stable input fingerprint for escrow bookkeeping; not cryptographic.
fn input_fingerprint(value: &Value) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    value.to_string().hash(&mut hasher);
    hasher.finish()
}
