//! Settlement and reputation ledger.
//!
//! Payments and ratings flow through a trait so the orchestrator can run
//! against a real settlement service, or against a no-op ledger in tests
//! and demos. All ledger calls that return a receipt yield the service's
//! transaction hash string.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::OrchestratorError;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReputationData {
    pub reputation_score: f64,
    pub average_rating: f64,
    pub total_tasks: u64,
    pub successful_tasks: u64,
    pub average_latency_ms: u64,
}

#[async_trait]
pub trait SettlementLedger: Send + Sync {
    /// Escrow the job budget before any agent runs.
    async fn create_task(
        &self,
        job_id: &str,
        agent_url: &str,
        input_hash: &str,
        deadline_secs: u64,
        payment: u64,
    ) -> Result<String, OrchestratorError>;

    async fn pay_agent(
        &self,
        job_id: &str,
        wallet: &str,
        amount: u64,
        result_summary: &Value,
    ) -> Result<String, OrchestratorError>;

    async fn pay_orchestrator(&self, job_id: &str, amount: u64)
        -> Result<String, OrchestratorError>;

    async fn complete_job(
        &self,
        job_id: &str,
        agents: &[String],
        ratings: &[u8],
    ) -> Result<String, OrchestratorError>;

    async fn rate_agent(&self, wallet: &str, rating: u8) -> Result<String, OrchestratorError>;

    /// Reputation feed. Callers treat this as best-effort and must not
    /// fail a task because the feed was unreachable.
    async fn record_task_completion(
        &self,
        agent: &str,
        success: bool,
        latency_ms: u64,
    ) -> Result<(), OrchestratorError>;

    async fn reputation(&self, wallet: &str) -> Result<ReputationData, OrchestratorError>;
}

/// Ledger backed by an HTTP settlement service.
pub struct HttpLedger {
    client: reqwest::Client,
    base_url: String,
}

impl HttpLedger {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn post_for_hash(&self, path: &str, body: Value) -> Result<String, OrchestratorError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| OrchestratorError::SettlementFailure(format!("{path}: {e}")))?;
        if !resp.status().is_success() {
            return Err(OrchestratorError::SettlementFailure(format!(
                "{path}: status {}",
                resp.status()
            )));
        }
        let payload: Value = resp
            .json()
            .await
            .map_err(|e| OrchestratorError::SettlementFailure(format!("{path}: {e}")))?;
        Ok(payload
            .get("txHash")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }
}

#[async_trait]
impl SettlementLedger for HttpLedger {
    async fn create_task(
        &self,
        job_id: &str,
        agent_url: &str,
        input_hash: &str,
        deadline_secs: u64,
        payment: u64,
    ) -> Result<String, OrchestratorError> {
        self.post_for_hash(
            "/tasks",
            json!({
                "jobId": job_id,
                "agentUrl": agent_url,
                "inputHash": input_hash,
                "deadline": deadline_secs,
                "payment": payment,
            }),
        )
        .await
    }

    async fn pay_agent(
        &self,
        job_id: &str,
        wallet: &str,
        amount: u64,
        result_summary: &Value,
    ) -> Result<String, OrchestratorError> {
        self.post_for_hash(
            "/payments/agent",
            json!({
                "jobId": job_id,
                "wallet": wallet,
                "amount": amount,
                "result": result_summary,
            }),
        )
        .await
    }

    async fn pay_orchestrator(
        &self,
        job_id: &str,
        amount: u64,
    ) -> Result<String, OrchestratorError> {
        self.post_for_hash(
            "/payments/orchestrator",
            json!({ "jobId": job_id, "amount": amount }),
        )
        .await
    }

    async fn complete_job(
        &self,
        job_id: &str,
        agents: &[String],
        ratings: &[u8],
    ) -> Result<String, OrchestratorError> {
        self.post_for_hash(
            &format!("/jobs/{job_id}/complete"),
            json!({ "agents": agents, "ratings": ratings }),
        )
        .await
    }

    async fn rate_agent(&self, wallet: &str, rating: u8) -> Result<String, OrchestratorError> {
        self.post_for_hash("/ratings", json!({ "wallet": wallet, "rating": rating }))
            .await
    }

    async fn record_task_completion(
        &self,
        agent: &str,
        success: bool,
        latency_ms: u64,
    ) -> Result<(), OrchestratorError> {
        self.post_for_hash(
            "/completions",
            json!({ "agent": agent, "success": success, "latencyMs": latency_ms }),
        )
        .await
        .map(|_| ())
    }

    async fn reputation(&self, wallet: &str) -> Result<ReputationData, OrchestratorError> {
        let url = format!("{}/reputation/{wallet}", self.base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| OrchestratorError::SettlementFailure(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(OrchestratorError::SettlementFailure(format!(
                "reputation: status {}",
                resp.status()
            )));
        }
        resp.json()
            .await
            .map_err(|e| OrchestratorError::SettlementFailure(e.to_string()))
    }
}

/// Ledger that accepts everything and pays nobody. Default when no
/// settlement service is configured.
#[derive(Default)]
pub struct NoopLedger;

#[async_trait]
impl SettlementLedger for NoopLedger {
    async fn create_task(
        &self,
        job_id: &str,
        _agent_url: &str,
        _input_hash: &str,
        _deadline_secs: u64,
        _payment: u64,
    ) -> Result<String, OrchestratorError> {
        Ok(format!("noop-escrow-{job_id}"))
    }

    async fn pay_agent(
        &self,
        job_id: &str,
        _wallet: &str,
        _amount: u64,
        _result_summary: &Value,
    ) -> Result<String, OrchestratorError> {
        Ok(format!("noop-pay-{job_id}"))
    }

    async fn pay_orchestrator(
        &self,
        job_id: &str,
        _amount: u64,
    ) -> Result<String, OrchestratorError> {
        Ok(format!("noop-fee-{job_id}"))
    }

    async fn complete_job(
        &self,
        job_id: &str,
        _agents: &[String],
        _ratings: &[u8],
    ) -> Result<String, OrchestratorError> {
        Ok(format!("noop-complete-{job_id}"))
    }

    async fn rate_agent(&self, wallet: &str, _rating: u8) -> Result<String, OrchestratorError> {
        Ok(format!("noop-rating-{wallet}"))
    }

    async fn record_task_completion(
        &self,
        _agent: &str,
        _success: bool,
        _latency_ms: u64,
    ) -> Result<(), OrchestratorError> {
        Ok(())
    }

    async fn reputation(&self, _wallet: &str) -> Result<ReputationData, OrchestratorError> {
        Ok(ReputationData::default())
    }
}
