//! Orchestrator configuration.
//!
//! Loaded from an optional JSON file, then overridden by environment
//! variables so deployments can inject secrets without editing the file.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::OrchestratorError;
use crate::mcp::McpServerConfig;
use crate::planner::llm::LlmConfig;
use crate::planner::rules::PlannerRules;
use crate::workflow::FailurePolicy;

fn default_bind_addr() -> String {
    "0.0.0.0:3100".to_string()
}

fn default_orchestrator_fee() -> u64 {
    1
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementMode {
    Http,
    /// No-op ledger: every call succeeds with a synthetic receipt.
    #[default]
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SettlementConfig {
    #[serde(default)]
    pub mode: SettlementMode,
    /// Base URL of the settlement service, required in `http` mode.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl SettlementConfig {
    /// The ledger endpoint, when settlement is actually enabled.
    pub fn endpoint(&self) -> Option<&str> {
        match self.mode {
            SettlementMode::Http => self.base_url.as_deref(),
            SettlementMode::Disabled => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrchestratorConfig {
    /// HTTP agent base URLs, each serving /meta, /run, /health.
    pub agent_endpoints: Vec<String>,
    /// Named MCP server launch commands.
    pub mcp_servers: HashMap<String, McpServerConfig>,
    /// LLM planner; absent means rule-based planning only.
    pub planner: Option<LlmConfig>,
    pub planner_rules: PlannerRules,
    pub failure_policy: FailurePolicy,
    pub settlement: SettlementConfig,
    #[serde(default = "default_orchestrator_fee")]
    pub orchestrator_fee: u64,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            agent_endpoints: Vec::new(),
            mcp_servers: HashMap::new(),
            planner: None,
            planner_rules: PlannerRules::default(),
            failure_policy: FailurePolicy::default(),
            settlement: SettlementConfig::default(),
            orchestrator_fee: default_orchestrator_fee(),
            bind_addr: default_bind_addr(),
        }
    }
}

impl OrchestratorConfig {
    /// Read the config file if one exists, then apply env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, OrchestratorError> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    OrchestratorError::Internal(format!("reading {}: {e}", path.display()))
                })?;
                serde_json::from_str(&raw).map_err(|e| {
                    OrchestratorError::Internal(format!("parsing {}: {e}", path.display()))
                })?
            }
            _ => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(addr) = std::env::var("MAHA_BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Ok(endpoints) = std::env::var("MAHA_AGENT_ENDPOINTS") {
            self.agent_endpoints = endpoints
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(url) = std::env::var("MAHA_SETTLEMENT_URL") {
            self.settlement.mode = SettlementMode::Http;
            self.settlement.base_url = Some(url);
        }
        let api_key =
            std::env::var("MAHA_LLM_API_KEY").or_else(|_| std::env::var("OPENAI_API_KEY"));
        if let Ok(key) = api_key {
            let base_url = std::env::var("MAHA_LLM_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
            let model =
                std::env::var("MAHA_LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
            match &mut self.planner {
                Some(planner) => planner.api_key = key,
                None => {
                    self.planner = Some(LlmConfig {
                        base_url,
                        api_key: key,
                        model,
                        temperature: None,
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.bind_addr, "0.0.0.0:3100");
        assert!(config.planner.is_none());
        assert_eq!(config.failure_policy, FailurePolicy::BestEffort);
    }

    #[test]
    fn parses_full_config_file() {
        let raw = r#"{
            "agentEndpoints": ["http://localhost:3001", "http://localhost:3002"],
            "mcpServers": {
                "playwright": {"command": "npx", "args": ["@playwright/mcp"]}
            },
            "failurePolicy": "strict",
            "settlement": {"mode": "http", "baseUrl": "http://localhost:4000"},
            "orchestratorFee": 2,
            "bindAddr": "127.0.0.1:8080"
        }"#;
        let config: OrchestratorConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.agent_endpoints.len(), 2);
        assert!(config.mcp_servers.contains_key("playwright"));
        assert_eq!(config.failure_policy, FailurePolicy::Strict);
        assert_eq!(config.settlement.endpoint(), Some("http://localhost:4000"));
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
    }
}
