//! LLM chat backend used by the planner and the step-input transformer.
//!
//! The backend is a trait so the deterministic non-LLM paths stay first-class
//! and the tests can inject canned completions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::OrchestratorError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    #[serde(default)]
    pub temperature: Option<f64>,
}

#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// One-shot completion: system prompt + user prompt in, text out.
    async fn complete(&self, system: &str, user: &str) -> Result<String, OrchestratorError>;
}

/// Production backend: OpenAI-compatible `/chat/completions`.
pub struct LlmClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            config,
        }
    }
}

#[async_trait]
impl ChatBackend for LlmClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, OrchestratorError> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let mut messages = Vec::new();
        if !system.is_empty() {
            messages.push(serde_json::json!({"role": "system", "content": system}));
        }
        messages.push(serde_json::json!({"role": "user", "content": user}));

        let mut body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
        });
        if let Some(temp) = self.config.temperature {
            body["temperature"] = serde_json::Value::from(temp);
        }

        tracing::debug!("[llm] calling {} (model: {})", url, self.config.model);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| OrchestratorError::PlanningFailure(format!("LLM request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| OrchestratorError::PlanningFailure(format!("LLM body read failed: {e}")))?;

        if !status.is_success() {
            return Err(OrchestratorError::PlanningFailure(format!(
                "LLM API returned {status}: {text}"
            )));
        }

        let json: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| OrchestratorError::PlanningFailure(format!("LLM bad JSON: {e}")))?;

        let content = json
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|arr| arr.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|msg| msg.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| {
                OrchestratorError::PlanningFailure("LLM response had no content".into())
            })?;

        Ok(content.to_string())
    }
}

/// Strip markdown code fences some models wrap JSON in.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}
