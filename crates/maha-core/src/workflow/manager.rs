//! Workflow lifecycle: planning, execution, and bookkeeping.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::OrchestratorError;
use crate::models::workflow::{
    ExecutionMode, ExecutionStatus, StepStatus, WorkflowDefinition, WorkflowExecution,
    WorkflowStep,
};
use crate::planner::WorkflowPlanner;
use crate::runner::JobRunner;
use crate::store::{ExecutionStore, WorkflowStore};
use crate::workflow::fallback::fallback_output;
use crate::workflow::mapping::{apply_output_mapping, map_step_input};
use crate::workflow::transform::{StepTransformer, TransformContext};

/// What a failed step does to the rest of the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Substitute a category-appropriate fallback result and keep going.
    #[default]
    BestEffort,
    /// Mark the step and the execution failed and stop.
    Strict,
}

pub struct WorkflowManager {
    planner: Arc<WorkflowPlanner>,
    runner: Arc<JobRunner>,
    transformer: Option<Arc<dyn StepTransformer>>,
    workflows: Arc<WorkflowStore>,
    executions: Arc<ExecutionStore>,
    policy: FailurePolicy,
}

impl WorkflowManager {
    pub fn new(
        planner: Arc<WorkflowPlanner>,
        runner: Arc<JobRunner>,
        transformer: Option<Arc<dyn StepTransformer>>,
        workflows: Arc<WorkflowStore>,
        executions: Arc<ExecutionStore>,
        policy: FailurePolicy,
    ) -> Self {
        Self {
            planner,
            runner,
            transformer,
            workflows,
            executions,
            policy,
        }
    }

    /// Plan a workflow from a natural-language intent and store it.
    /// Planning itself never fails; an intent no agent can serve yields
    /// an empty-step workflow the caller can inspect.
    pub async fn create_workflow(
        &self,
        user_intent: &str,
        context: Value,
    ) -> Result<WorkflowDefinition, OrchestratorError> {
        let agents = self.runner.discover_agents().await;
        info!(user_intent, agent_count = agents.len(), "planning workflow");

        let (steps, execution_mode) = self.planner.plan(user_intent, &context, &agents).await;
        let workflow = WorkflowDefinition {
            workflow_id: format!("workflow_{}", Uuid::new_v4().simple()),
            name: workflow_name(user_intent),
            description: format!("Workflow for: {user_intent}"),
            user_intent: user_intent.to_string(),
            estimated_duration_ms: steps.len() as u64 * 5_000,
            steps,
            execution_mode,
            created_at: Utc::now(),
            variables: HashMap::new(),
        };
        self.workflows.put(workflow.clone()).await;
        Ok(workflow)
    }

    /// Run a stored workflow. The returned execution record carries the
    /// outcome; a failed run is an `Ok` with `status == Failed`, so the
    /// caller always gets the step-level detail.
    pub async fn execute_workflow(
        &self,
        workflow_id: &str,
        input: Option<Value>,
    ) -> Result<WorkflowExecution, OrchestratorError> {
        let workflow = self
            .workflows
            .get(workflow_id)
            .await
            .ok_or_else(|| OrchestratorError::WorkflowNotFound(workflow_id.to_string()))?;

        let input = match input {
            Some(v) if !v.is_null() => v,
            _ => generate_default_input(&workflow),
        };

        let execution_id = format!("exec_{}", Uuid::new_v4().simple());
        let mut execution = WorkflowExecution::new(execution_id.clone(), &workflow, input.clone());
        self.executions.put(execution.clone()).await;

        execution.status = ExecutionStatus::Running;
        self.executions.put(execution.clone()).await;

        let mut variables = workflow.variables.clone();
        variables.insert("userInput".to_string(), input.clone());

        let outcome = match workflow.execution_mode {
            ExecutionMode::Parallel => {
                self.run_parallel(&workflow, &mut execution, &input, &mut variables)
                    .await
            }
            // Conditional plans run as sequential until predicate-skip
            // semantics land.
            ExecutionMode::Sequential | ExecutionMode::Conditional => {
                self.run_sequential(&workflow, &mut execution, &input, &mut variables)
                    .await
            }
        };

        match outcome {
            Ok(output) => {
                execution.status = ExecutionStatus::Completed;
                execution.output = Some(output);
            }
            Err(e) => {
                warn!(execution_id, error = %e, "workflow execution failed");
                execution.status = ExecutionStatus::Failed;
                execution.error = Some(e.to_string());
            }
        }
        execution.completed_at = Some(Utc::now());
        self.executions.put(execution.clone()).await;
        Ok(execution)
    }

    async fn run_sequential(
        &self,
        workflow: &WorkflowDefinition,
        execution: &mut WorkflowExecution,
        input: &Value,
        variables: &mut HashMap<String, Value>,
    ) -> Result<Value, OrchestratorError> {
        let mut current = input.clone();
        for (i, step) in workflow.steps.iter().enumerate() {
            execution.step_results[i].status = StepStatus::Running;
            execution.step_results[i].started_at = Some(Utc::now());
            self.executions.put(execution.clone()).await;

            let mapped = if i == 0 {
                map_step_input(step, variables, input)
            } else {
                self.transform_step_input(workflow, step, &current, variables)
                    .await
            };
            execution.step_results[i].input = Some(mapped.clone());

            let output = match self.runner.execute_agent_task(&step.agent_url, &mapped).await {
                Ok(output) => output,
                Err(e) => match self.policy {
                    FailurePolicy::BestEffort => {
                        warn!(step_id = %step.step_id, error = %e, "step failed, using fallback result");
                        execution.step_results[i].error = Some(e.to_string());
                        fallback_output(&step.agent_name, &mapped, &e.to_string())
                    }
                    FailurePolicy::Strict => {
                        execution.step_results[i].status = StepStatus::Failed;
                        execution.step_results[i].error = Some(e.to_string());
                        execution.step_results[i].completed_at = Some(Utc::now());
                        self.executions.put(execution.clone()).await;
                        return Err(e);
                    }
                },
            };

            apply_output_mapping(step, &output, variables);
            execution.step_results[i].status = StepStatus::Completed;
            execution.step_results[i].output = Some(output.clone());
            execution.step_results[i].completed_at = Some(Utc::now());
            self.executions.put(execution.clone()).await;
            current = output;
        }
        Ok(current)
    }

    /// Every step gets the same user input; results are keyed by step id.
    /// Any single failure fails the whole batch, regardless of failure
    /// policy: per-step fallbacks only make sense when later steps can
    /// consume them, which never happens in a parallel fan-out.
    async fn run_parallel(
        &self,
        workflow: &WorkflowDefinition,
        execution: &mut WorkflowExecution,
        input: &Value,
        variables: &mut HashMap<String, Value>,
    ) -> Result<Value, OrchestratorError> {
        let mut mapped_inputs = Vec::with_capacity(workflow.steps.len());
        for (i, step) in workflow.steps.iter().enumerate() {
            let mapped = map_step_input(step, variables, input);
            execution.step_results[i].status = StepStatus::Running;
            execution.step_results[i].started_at = Some(Utc::now());
            execution.step_results[i].input = Some(mapped.clone());
            mapped_inputs.push(mapped);
        }
        self.executions.put(execution.clone()).await;

        let futures = workflow
            .steps
            .iter()
            .zip(mapped_inputs.iter())
            .map(|(step, mapped)| self.runner.execute_agent_task(&step.agent_url, mapped));
        let results = futures::future::join_all(futures).await;

        let mut outputs = Map::new();
        let mut first_error = None;
        for (i, (step, result)) in workflow.steps.iter().zip(results).enumerate() {
            execution.step_results[i].completed_at = Some(Utc::now());
            match result {
                Ok(output) => {
                    apply_output_mapping(step, &output, variables);
                    execution.step_results[i].status = StepStatus::Completed;
                    execution.step_results[i].output = Some(output.clone());
                    outputs.insert(step.step_id.clone(), output);
                }
                Err(e) => {
                    execution.step_results[i].status = StepStatus::Failed;
                    execution.step_results[i].error = Some(e.to_string());
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }
        self.executions.put(execution.clone()).await;

        match first_error {
            Some(e) => Err(e),
            None => Ok(Value::Object(outputs)),
        }
    }

    /// Shape the previous step's output into the next agent's input.
    /// Prefers the configured transformer when the target schema is
    /// known; any transformer failure degrades to static mapping with
    /// the previous output as the default input, so an unmapped step
    /// still receives its predecessor's result.
    async fn transform_step_input(
        &self,
        workflow: &WorkflowDefinition,
        step: &WorkflowStep,
        previous_output: &Value,
        variables: &HashMap<String, Value>,
    ) -> Value {
        if let Some(transformer) = &self.transformer {
            if let Some(descriptor) = self.runner.descriptor_for_url(&step.agent_url).await {
                let context = TransformContext {
                    user_intent: &workflow.user_intent,
                    step_description: &step.description,
                    variables,
                };
                match transformer
                    .transform(previous_output, descriptor.input_schema(), &context)
                    .await
                {
                    Ok(shaped) => return shaped,
                    Err(e) => {
                        debug!(step_id = %step.step_id, error = %e, "transform failed, falling back to static mapping");
                    }
                }
            }
        }
        map_step_input(step, variables, previous_output)
    }

    pub async fn get_workflow(&self, workflow_id: &str) -> Option<WorkflowDefinition> {
        self.workflows.get(workflow_id).await
    }

    pub async fn list_workflows(&self) -> Vec<WorkflowDefinition> {
        self.workflows.list().await
    }

    pub async fn get_execution(&self, execution_id: &str) -> Option<WorkflowExecution> {
        self.executions.get(execution_id).await
    }

    pub async fn list_executions(&self) -> Vec<WorkflowExecution> {
        self.executions.list().await
    }
}

fn workflow_name(user_intent: &str) -> String {
    let mut words: Vec<String> = user_intent
        .split_whitespace()
        .take(4)
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();
    if words.is_empty() {
        words.push("Untitled".to_string());
    }
    format!("{} Workflow", words.join(" "))
}

/// Best-guess input for an execution started without one, keyed off what
/// the first step's agent looks like and what the intent mentions.
pub fn generate_default_input(workflow: &WorkflowDefinition) -> Value {
    let intent = &workflow.user_intent;
    let first_agent = workflow
        .steps
        .first()
        .map(|s| s.agent_name.to_lowercase())
        .unwrap_or_default();

    if first_agent.contains("hello") || first_agent.contains("greet") {
        return json!({
            "name": extract_name(intent).unwrap_or_else(|| "Demo User".to_string()),
            "language": extract_language(intent).unwrap_or_else(|| "english".to_string()),
        });
    }
    if first_agent.contains("image") || first_agent.contains("dall") {
        return json!({
            "prompt": extract_image_prompt(intent).unwrap_or_else(|| intent.clone()),
        });
    }
    if first_agent.contains("nft") || first_agent.contains("deploy") || first_agent.contains("mint")
    {
        return json!({
            "collectionName": extract_quoted_after(intent, &["collection"])
                .unwrap_or_else(|| "AI Generated Collection".to_string()),
            "tokenName": extract_quoted_after(intent, &["token", "nft"])
                .unwrap_or_else(|| "AI NFT".to_string()),
        });
    }
    json!({ "input": intent })
}

fn extract_name(intent: &str) -> Option<String> {
    let re = regex::Regex::new(r"(?i)\b(?:for|named|called)\s+([A-Za-z][\w-]*)").ok()?;
    re.captures(intent)
        .map(|c| c[1].to_string())
        .filter(|n| !n.eq_ignore_ascii_case("the") && !n.eq_ignore_ascii_case("a"))
}

fn extract_language(intent: &str) -> Option<String> {
    const LANGUAGES: &[&str] = &[
        "spanish", "french", "german", "italian", "japanese", "chinese", "english",
    ];
    let lower = intent.to_lowercase();
    LANGUAGES
        .iter()
        .find(|lang| lower.contains(*lang))
        .map(|lang| lang.to_string())
}

fn extract_image_prompt(intent: &str) -> Option<String> {
    let re = regex::Regex::new(r"(?i)(?:image|picture|illustration)\s+of\s+(.+)").ok()?;
    re.captures(intent).map(|c| c[1].trim().to_string())
}

fn extract_quoted_after(intent: &str, markers: &[&str]) -> Option<String> {
    for marker in markers {
        let pattern = format!(
            r#"(?i)\b{marker}\s+(?:named|called)\s+"?([^",.]+)"?"#
        );
        if let Some(c) = regex::Regex::new(&pattern).ok()?.captures(intent) {
            return Some(c[1].trim().to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn workflow_with_first_agent(agent_name: &str, intent: &str) -> WorkflowDefinition {
        WorkflowDefinition {
            workflow_id: "workflow_t".into(),
            name: workflow_name(intent),
            description: format!("Workflow for: {intent}"),
            user_intent: intent.to_string(),
            steps: vec![WorkflowStep {
                step_id: "step_1".into(),
                agent_name: agent_name.into(),
                agent_url: "http://localhost:9".into(),
                description: "first".into(),
                input_mapping: BTreeMap::new(),
                output_mapping: BTreeMap::new(),
            }],
            execution_mode: ExecutionMode::Sequential,
            estimated_duration_ms: 5_000,
            created_at: Utc::now(),
            variables: HashMap::new(),
        }
    }

    #[test]
    fn name_takes_first_words_capitalized() {
        assert_eq!(
            workflow_name("mint an nft for the demo"),
            "Mint An Nft For Workflow"
        );
        assert_eq!(workflow_name(""), "Untitled Workflow");
    }

    #[test]
    fn default_input_for_greeting_agent_extracts_name_and_language() {
        let wf = workflow_with_first_agent("Hello Agent", "say hello for Alice in spanish");
        let input = generate_default_input(&wf);
        assert_eq!(input["name"], "Alice");
        assert_eq!(input["language"], "spanish");
    }

    #[test]
    fn default_input_for_image_agent_extracts_prompt() {
        let wf = workflow_with_first_agent(
            "DALL-E Image Agent",
            "generate an image of a sunset over mountains",
        );
        let input = generate_default_input(&wf);
        assert_eq!(input["prompt"], "a sunset over mountains");
    }

    #[test]
    fn default_input_for_nft_agent_uses_collection_defaults() {
        let wf = workflow_with_first_agent("NFT Deployer", "mint an nft");
        let input = generate_default_input(&wf);
        assert_eq!(input["collectionName"], "AI Generated Collection");
        assert_eq!(input["tokenName"], "AI NFT");
    }

    #[test]
    fn default_input_for_unknown_agent_wraps_intent() {
        let wf = workflow_with_first_agent("Weather Agent", "what is the weather");
        let input = generate_default_input(&wf);
        assert_eq!(input["input"], "what is the weather");
    }
}
