//! Step-to-step input transformation.
//!
//! After the first step, the previous step's raw output often does not
//! match the next agent's input schema. A transformer reshapes it; when
//! no transformer is configured, or the transformer fails, the executor
//! falls back to static mapping.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::OrchestratorError;
use crate::planner::llm::ChatBackend;

pub struct TransformContext<'a> {
    pub user_intent: &'a str,
    pub step_description: &'a str,
    pub variables: &'a HashMap<String, Value>,
}

#[async_trait]
pub trait StepTransformer: Send + Sync {
    /// Reshape `previous_output` into an object matching `target_schema`.
    /// Must return a JSON object on success.
    async fn transform(
        &self,
        previous_output: &Value,
        target_schema: &Value,
        context: &TransformContext<'_>,
    ) -> Result<Value, OrchestratorError>;
}

const TRANSFORM_SYSTEM_PROMPT: &str = "You convert JSON between agent formats. \
Given a previous step's output and a target JSON schema, respond with a single \
JSON object matching the target schema. Use values from the previous output and \
known variables where they fit. Respond with JSON only, no prose.";

/// Transformer that asks the chat backend to reshape the payload.
pub struct LlmTransformer {
    backend: Arc<dyn ChatBackend>,
}

impl LlmTransformer {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl StepTransformer for LlmTransformer {
    async fn transform(
        &self,
        previous_output: &Value,
        target_schema: &Value,
        context: &TransformContext<'_>,
    ) -> Result<Value, OrchestratorError> {
        let user = format!(
            "User intent: {intent}\nCurrent step: {step}\n\nPrevious step output:\n{output}\n\n\
             Known workflow variables:\n{vars}\n\nTarget input schema:\n{schema}",
            intent = context.user_intent,
            step = context.step_description,
            output = serde_json::to_string_pretty(previous_output).unwrap_or_default(),
            vars = serde_json::to_string_pretty(context.variables).unwrap_or_default(),
            schema = serde_json::to_string_pretty(target_schema).unwrap_or_default(),
        );
        let raw = self.backend.complete(TRANSFORM_SYSTEM_PROMPT, &user).await?;
        let cleaned = crate::planner::llm::strip_code_fences(&raw);
        let value: Value = serde_json::from_str(cleaned).map_err(|e| {
            debug!(error = %e, "transformer returned non-JSON payload");
            OrchestratorError::PlanningFailure(format!("transform output was not JSON: {e}"))
        })?;
        if !value.is_object() {
            return Err(OrchestratorError::PlanningFailure(
                "transform output was not a JSON object".to_string(),
            ));
        }
        Ok(value)
    }
}
