//! Agent Schema Registry — discovery and validated execution of HTTP agents.
//!
//! `discover(url)` fetches `{url}/meta`, compiles both JSON Schemas into
//! validators and caches the descriptor keyed by URL. `execute` validates
//! input before the network call and the response body after it; either
//! failure is a `SchemaMismatch`. MCP-backed descriptors reuse the same
//! contract but source their schema from the tool list (see `mcp::adapter`).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use jsonschema::JSONSchema;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::OrchestratorError;
use crate::models::agent::{AgentDescriptor, AgentHealth, AgentHealthStatus, AgentMeta};

/// A discovered agent plus its compiled validators. Immutable once built;
/// re-discovery replaces the whole entry.
pub struct CachedAgent {
    pub descriptor: AgentDescriptor,
    input_validator: JSONSchema,
    output_validator: JSONSchema,
}

impl CachedAgent {
    fn compile(descriptor: AgentDescriptor) -> Result<Self, OrchestratorError> {
        let name = descriptor.name().to_string();
        let input_validator = JSONSchema::compile(descriptor.input_schema()).map_err(|e| {
            OrchestratorError::SchemaMismatch {
                agent: name.clone(),
                detail: format!("invalid input schema: {e}"),
            }
        })?;
        let output_validator = JSONSchema::compile(descriptor.output_schema()).map_err(|e| {
            OrchestratorError::SchemaMismatch {
                agent: name.clone(),
                detail: format!("invalid output schema: {e}"),
            }
        })?;
        Ok(Self {
            descriptor,
            input_validator,
            output_validator,
        })
    }

    pub fn validate_input(&self, input: &Value) -> Result<(), OrchestratorError> {
        validate(&self.input_validator, input, self.descriptor.name(), "input")
    }

    pub fn validate_output(&self, output: &Value) -> Result<(), OrchestratorError> {
        validate(&self.output_validator, output, self.descriptor.name(), "output")
    }
}

fn validate(
    validator: &JSONSchema,
    instance: &Value,
    agent: &str,
    direction: &str,
) -> Result<(), OrchestratorError> {
    if let Err(errors) = validator.validate(instance) {
        let detail = errors
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(OrchestratorError::SchemaMismatch {
            agent: agent.to_string(),
            detail: format!("{direction} failed validation: {detail}"),
        });
    }
    Ok(())
}

pub struct AgentRegistry {
    client: reqwest::Client,
    cache: RwLock<HashMap<String, Arc<CachedAgent>>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch `{url}/meta`, compile validators and cache the result.
    /// Cached entries are returned as-is; use [`refresh`](Self::refresh) to
    /// force a re-fetch.
    pub async fn discover(&self, url: &str) -> Result<Arc<CachedAgent>, OrchestratorError> {
        if let Some(cached) = self.cache.read().await.get(url) {
            return Ok(cached.clone());
        }
        self.refresh(url).await
    }

    /// Re-fetch an agent's capability document, replacing any cached entry.
    pub async fn refresh(&self, url: &str) -> Result<Arc<CachedAgent>, OrchestratorError> {
        let meta_url = format!("{}/meta", url.trim_end_matches('/'));
        let response = self
            .client
            .get(&meta_url)
            .send()
            .await
            .map_err(|e| OrchestratorError::AgentUnavailable(format!("{meta_url}: {e}")))?;

        if !response.status().is_success() {
            return Err(OrchestratorError::AgentUnavailable(format!(
                "{meta_url}: HTTP {}",
                response.status()
            )));
        }

        let meta: AgentMeta = response
            .json()
            .await
            .map_err(|e| OrchestratorError::AgentUnavailable(format!("{meta_url}: bad meta: {e}")))?;

        let descriptor = AgentDescriptor::Http {
            url: url.trim_end_matches('/').to_string(),
            name: meta.name,
            description: meta.description,
            wallet: meta.wallet,
            category: meta.category,
            tags: meta.tags,
            input_schema: meta.input_schema,
            output_schema: meta.output_schema,
            preview_uri: meta.preview_uri,
        };

        let cached = Arc::new(CachedAgent::compile(descriptor)?);
        self.cache
            .write()
            .await
            .insert(url.trim_end_matches('/').to_string(), cached.clone());
        tracing::info!("[registry] discovered agent at {}", url);
        Ok(cached)
    }

    /// Validate input, POST `{url}/run`, validate the response.
    ///
    /// Input that fails the agent's schema never reaches the wire.
    pub async fn execute(
        &self,
        agent: &CachedAgent,
        input: &Value,
    ) -> Result<Value, OrchestratorError> {
        agent.validate_input(input)?;

        let AgentDescriptor::Http { url, name, .. } = &agent.descriptor else {
            return Err(OrchestratorError::Internal(
                "AgentRegistry::execute called with an MCP descriptor".into(),
            ));
        };

        let run_url = format!("{url}/run");
        let response = self
            .client
            .post(&run_url)
            .json(input)
            .send()
            .await
            .map_err(|e| OrchestratorError::AgentUnavailable(format!("{name}: {e}")))?;

        if !response.status().is_success() {
            return Err(OrchestratorError::AgentUnavailable(format!(
                "{name}: /run returned HTTP {}",
                response.status()
            )));
        }

        let output: Value = response.json().await.map_err(|e| {
            OrchestratorError::AgentUnavailable(format!("{name}: non-JSON /run body: {e}"))
        })?;

        agent.validate_output(&output)?;
        Ok(output)
    }

    /// Best-effort liveness probe against `{url}/health`. Never errors.
    pub async fn health(&self, url: &str) -> AgentHealth {
        let health_url = format!("{}/health", url.trim_end_matches('/'));
        let started = Instant::now();
        match self.client.get(&health_url).send().await {
            Ok(response) if response.status().is_success() => AgentHealth {
                url: url.to_string(),
                status: AgentHealthStatus::Healthy,
                response_time_ms: Some(started.elapsed().as_millis() as u64),
                last_checked: Utc::now(),
                error: None,
            },
            Ok(response) => AgentHealth {
                url: url.to_string(),
                status: AgentHealthStatus::Unhealthy,
                response_time_ms: Some(started.elapsed().as_millis() as u64),
                last_checked: Utc::now(),
                error: Some(format!("HTTP {}", response.status())),
            },
            Err(e) => AgentHealth {
                url: url.to_string(),
                status: AgentHealthStatus::Unhealthy,
                response_time_ms: None,
                last_checked: Utc::now(),
                error: Some(e.to_string()),
            },
        }
    }

    /// All currently cached descriptors.
    pub async fn cached_descriptors(&self) -> Vec<AgentDescriptor> {
        self.cache
            .read()
            .await
            .values()
            .map(|c| c.descriptor.clone())
            .collect()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cached(input_schema: Value, output_schema: Value) -> CachedAgent {
        CachedAgent::compile(AgentDescriptor::Http {
            url: "https://wallet.example".into(),
            name: "WalletInfo".into(),
            description: "chain lookups".into(),
            wallet: None,
            category: None,
            tags: vec![],
            input_schema,
            output_schema,
            preview_uri: None,
        })
        .unwrap()
    }

    #[test]
    fn input_missing_required_field_is_schema_mismatch() {
        let agent = cached(
            json!({
                "type": "object",
                "properties": {
                    "address": {"type": "string"},
                    "chain": {"type": "string"}
                },
                "required": ["address", "chain"]
            }),
            json!({"type": "object"}),
        );

        let err = agent
            .validate_input(&json!({"address": "0xabc"}))
            .unwrap_err();
        match err {
            OrchestratorError::SchemaMismatch { detail, .. } => {
                assert!(detail.contains("chain"), "detail was: {detail}");
            }
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }

        agent
            .validate_input(&json!({"address": "0xabc", "chain": "sepolia"}))
            .unwrap();
    }

    #[test]
    fn output_validation_rejects_wrong_shape() {
        let agent = cached(
            json!({"type": "object"}),
            json!({
                "type": "object",
                "properties": {"greeting": {"type": "string"}},
                "required": ["greeting"]
            }),
        );
        assert!(agent.validate_output(&json!({"greeting": "hi"})).is_ok());
        assert!(agent.validate_output(&json!({"other": 1})).is_err());
    }
}
