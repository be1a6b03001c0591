//! Workflow Planner — turns a user intent plus discovered agent descriptors
//! into an ordered step plan.
//!
//! Primary path: one prompt embedding the intent and every agent's full
//! input/output schema, answered by an LLM as strict JSON. The parsed plan is
//! validated against the discovered agent set — a typo'd agent name must not
//! silently produce a broken workflow. Fallback path: deterministic
//! rule-based planning (`rules`), used whenever the LLM is absent, errors, or
//! its output fails validation. The fallback itself never raises.

pub mod llm;
pub mod rules;

pub use llm::{ChatBackend, LlmClient, LlmConfig};
pub use rules::{PlannerRules, RulePlanner};

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::error::OrchestratorError;
use crate::models::agent::AgentDescriptor;
use crate::models::workflow::{ExecutionMode, WorkflowStep};

const PLANNER_SYSTEM_PROMPT: &str = "You are an expert AI workflow planner. Your job is to \
analyze user requests and create optimal multi-agent workflows using available agents. \
Always respond with valid JSON.";

/// The structured object requested from the LLM.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlannedWorkflow {
    #[serde(default)]
    #[allow(dead_code)]
    reasoning: String,
    #[serde(default)]
    execution_mode: Option<String>,
    steps: Vec<PlannedStep>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlannedStep {
    #[serde(default)]
    step_id: Option<String>,
    agent_name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    input_mapping: BTreeMap<String, String>,
    #[serde(default)]
    output_mapping: BTreeMap<String, String>,
}

pub struct WorkflowPlanner {
    backend: Option<Arc<dyn ChatBackend>>,
    fallback: RulePlanner,
}

impl WorkflowPlanner {
    pub fn new(backend: Option<Arc<dyn ChatBackend>>, rules: PlannerRules) -> Self {
        Self {
            backend,
            fallback: RulePlanner::new(rules),
        }
    }

    /// Plan a workflow. Planner failures are recovered locally by the
    /// rule-based fallback; this method never errors.
    pub async fn plan(
        &self,
        intent: &str,
        context: &Value,
        agents: &[AgentDescriptor],
    ) -> (Vec<WorkflowStep>, ExecutionMode) {
        if let Some(backend) = &self.backend {
            match self.plan_with_llm(backend.as_ref(), intent, context, agents).await {
                Ok(plan) => return plan,
                Err(e) => {
                    tracing::warn!("[planner] LLM planning failed, using rules: {}", e);
                }
            }
        }

        (self.fallback.plan(intent, agents), ExecutionMode::Sequential)
    }

    async fn plan_with_llm(
        &self,
        backend: &dyn ChatBackend,
        intent: &str,
        context: &Value,
        agents: &[AgentDescriptor],
    ) -> Result<(Vec<WorkflowStep>, ExecutionMode), OrchestratorError> {
        let prompt = build_planning_prompt(intent, context, agents);
        let raw = backend.complete(PLANNER_SYSTEM_PROMPT, &prompt).await?;

        let plan: PlannedWorkflow = serde_json::from_str(llm::strip_code_fences(&raw))
            .map_err(|e| OrchestratorError::PlanningFailure(format!("malformed plan JSON: {e}")))?;

        let mode = plan
            .execution_mode
            .as_deref()
            .map(ExecutionMode::from_str)
            .unwrap_or(ExecutionMode::Sequential);

        let steps = convert_plan(plan, agents)?;
        Ok((steps, mode))
    }
}

/// Resolve each planned step against the discovered agent set. An unknown
/// agent name fails the whole plan.
fn convert_plan(
    plan: PlannedWorkflow,
    agents: &[AgentDescriptor],
) -> Result<Vec<WorkflowStep>, OrchestratorError> {
    plan.steps
        .into_iter()
        .enumerate()
        .map(|(index, planned)| {
            let agent = agents
                .iter()
                .find(|a| a.name() == planned.agent_name)
                .ok_or_else(|| {
                    OrchestratorError::PlanningFailure(format!(
                        "plan references unknown agent \"{}\"",
                        planned.agent_name
                    ))
                })?;

            Ok(WorkflowStep {
                step_id: planned
                    .step_id
                    .unwrap_or_else(|| format!("step_{}", index + 1)),
                agent_name: agent.name().to_string(),
                agent_url: agent.url(),
                description: planned
                    .description
                    .unwrap_or_else(|| format!("Execute {}", agent.name())),
                input_mapping: planned.input_mapping,
                output_mapping: planned.output_mapping,
            })
        })
        .collect()
}

fn build_planning_prompt(intent: &str, context: &Value, agents: &[AgentDescriptor]) -> String {
    let mut agent_list = String::new();
    for (i, agent) in agents.iter().enumerate() {
        agent_list.push_str(&format!(
            "\n{}. {}\n   Description: {}\n   Input Schema: {}\n   Output Schema: {}\n   URL: {}\n",
            i + 1,
            agent.name(),
            agent.description(),
            serde_json::to_string_pretty(agent.input_schema()).unwrap_or_default(),
            serde_json::to_string_pretty(agent.output_schema()).unwrap_or_default(),
            agent.url(),
        ));
    }

    format!(
        r#"TASK: Create an optimal workflow plan for the following user request.

USER REQUEST: "{intent}"

CONTEXT: {context}

AVAILABLE AGENTS:
{agent_list}

INSTRUCTIONS:
1. Analyze the user request to understand what they want to accomplish
2. Determine which agents are needed and in what order
3. Design input/output mappings to chain agents together effectively
4. Consider if agents should run sequentially (one after another) or in parallel
5. Create meaningful step descriptions

RESPONSE FORMAT (JSON only):
{{
  "reasoning": "Brief explanation of your workflow design decisions",
  "executionMode": "sequential" | "parallel" | "conditional",
  "steps": [
    {{
      "stepId": "step_1",
      "agentName": "exact agent name from available agents",
      "description": "what this step accomplishes",
      "inputMapping": {{ "agentInputField": "sourceVariable or userInput field" }},
      "outputMapping": {{ "agentOutputField": "workflowVariableName" }}
    }}
  ]
}}

IMPORTANT:
- Only use agents that are actually available in the list above
- Ensure input mappings reference valid fields from user input or previous step outputs
- Make sure output mappings capture useful data for subsequent steps
- Respond with ONLY the JSON object, no additional text
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct CannedBackend(String);

    #[async_trait]
    impl ChatBackend for CannedBackend {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String, OrchestratorError> {
            Ok(self.0.clone())
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl ChatBackend for FailingBackend {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String, OrchestratorError> {
            Err(OrchestratorError::PlanningFailure("offline".into()))
        }
    }

    fn agents() -> Vec<AgentDescriptor> {
        ["Hello Agent", "DALL-E Image Generator"]
            .iter()
            .map(|name| AgentDescriptor::Http {
                url: format!("https://{}.example", name.to_lowercase().replace(' ', "-")),
                name: name.to_string(),
                description: String::new(),
                wallet: None,
                category: None,
                tags: vec![],
                input_schema: json!({"type": "object"}),
                output_schema: json!({"type": "object"}),
                preview_uri: None,
            })
            .collect()
    }

    #[tokio::test]
    async fn valid_llm_plan_is_used() {
        let canned = json!({
            "reasoning": "greet then draw",
            "executionMode": "sequential",
            "steps": [
                {"stepId": "step_1", "agentName": "Hello Agent", "description": "greet",
                 "inputMapping": {"name": "userName"}, "outputMapping": {"greeting": "g"}},
                {"stepId": "step_2", "agentName": "DALL-E Image Generator",
                 "inputMapping": {"prompt": "g"}, "outputMapping": {}}
            ]
        });
        let planner = WorkflowPlanner::new(
            Some(Arc::new(CannedBackend(canned.to_string()))),
            PlannerRules::default(),
        );
        let (steps, mode) = planner.plan("greet and draw", &json!({}), &agents()).await;
        assert_eq!(mode, ExecutionMode::Sequential);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1].description, "Execute DALL-E Image Generator");
    }

    #[tokio::test]
    async fn unknown_agent_name_falls_back_to_rules() {
        let canned = json!({
            "steps": [
                {"agentName": "Nonexistent Agent", "inputMapping": {}, "outputMapping": {}}
            ]
        });
        let planner = WorkflowPlanner::new(
            Some(Arc::new(CannedBackend(canned.to_string()))),
            PlannerRules::default(),
        );
        let (steps, _) = planner
            .plan("say hello please", &json!({}), &agents())
            .await;
        // Rule fallback picked the greeting agent instead of failing.
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].agent_name, "Hello Agent");
    }

    #[tokio::test]
    async fn backend_error_falls_back_to_rules() {
        let planner =
            WorkflowPlanner::new(Some(Arc::new(FailingBackend)), PlannerRules::default());
        let (steps, _) = planner
            .plan("generate an image of a sunset", &json!({}), &agents())
            .await;
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].agent_name, "DALL-E Image Generator");
    }

    #[tokio::test]
    async fn no_backend_and_no_match_yields_empty_plan() {
        let planner = WorkflowPlanner::new(None, PlannerRules::default());
        let (steps, mode) = planner.plan("anything", &json!({}), &[]).await;
        assert!(steps.is_empty());
        assert_eq!(mode, ExecutionMode::Sequential);
    }
}
