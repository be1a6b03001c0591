//! End-to-end workflow tests against live stub agents.

mod common;

use serde_json::{json, Value};

use maha_core::error::OrchestratorError;
use maha_core::models::workflow::{
    ExecutionMode, ExecutionStatus, StepStatus, WorkflowDefinition, WorkflowStep,
};
use maha_core::workflow::FailurePolicy;

use common::{agent_meta, make_harness, spawn_agent};

fn greeting_meta(name: &str) -> Value {
    agent_meta(
        name,
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "language": {"type": "string"}
            },
            "required": ["name"]
        }),
        json!({
            "type": "object",
            "properties": {"greeting": {"type": "string"}},
            "required": ["greeting"]
        }),
    )
}

fn greeting_run(input: Value) -> Result<Value, u16> {
    let name = input["name"].as_str().unwrap_or("stranger");
    let greeting = match input["language"].as_str() {
        Some("spanish") => format!("Hola, {name}!"),
        _ => format!("Hello, {name}!"),
    };
    Ok(json!({"greeting": greeting}))
}

fn image_meta() -> Value {
    agent_meta(
        "DALL-E Image Generator",
        json!({"type": "object"}),
        json!({
            "type": "object",
            "properties": {"imageUrl": {"type": "string"}},
            "required": ["imageUrl"]
        }),
    )
}

fn image_run(_input: Value) -> Result<Value, u16> {
    Ok(json!({"imageUrl": "http://images.example/generated/42.png"}))
}

fn echo_meta() -> Value {
    agent_meta("Echo Agent", json!({"type": "object"}), json!({"type": "object"}))
}

fn echo_run(input: Value) -> Result<Value, u16> {
    Ok(input)
}

fn nft_meta() -> Value {
    agent_meta(
        "NFT Deployer",
        json!({"type": "object"}),
        json!({
            "type": "object",
            "properties": {"transactionHash": {"type": "string"}},
            "required": ["transactionHash"]
        }),
    )
}

fn nft_run(input: Value) -> Result<Value, u16> {
    // Echo the image URL back so the chain is observable end to end.
    Ok(json!({
        "transactionHash": "0xreal_tx",
        "mintedFrom": input["imageUrl"],
    }))
}

#[tokio::test]
async fn greeting_workflow_plans_and_executes() {
    let url = spawn_agent(greeting_meta("Hello Agent"), greeting_run).await;
    let harness = make_harness(vec![url], FailurePolicy::BestEffort);

    let workflow = harness
        .manager
        .create_workflow("say hello to our new user", json!({}))
        .await
        .unwrap();
    assert_eq!(workflow.steps.len(), 1);
    assert!(workflow.workflow_id.starts_with("workflow_"));
    assert_eq!(workflow.estimated_duration_ms, 5_000);

    let execution = harness
        .manager
        .execute_workflow(
            &workflow.workflow_id,
            Some(json!({"name": "Alice", "language": "spanish"})),
        )
        .await
        .unwrap();

    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert!(execution.execution_id.starts_with("exec_"));
    assert_eq!(execution.step_results.len(), 1);
    assert_eq!(execution.step_results[0].status, StepStatus::Completed);
    assert!(execution.step_results[0].error.is_none());
    assert_eq!(
        execution.output.as_ref().unwrap()["greeting"],
        "Hola, Alice!"
    );

    // The stored record matches what the call returned.
    let stored = harness
        .manager
        .get_execution(&execution.execution_id)
        .await
        .unwrap();
    assert_eq!(stored.status, ExecutionStatus::Completed);

    // Re-running the same workflow gets its own execution record.
    let second = harness
        .manager
        .execute_workflow(&workflow.workflow_id, Some(json!({"name": "Bob"})))
        .await
        .unwrap();
    assert_ne!(second.execution_id, execution.execution_id);
    assert_eq!(harness.manager.list_executions().await.len(), 2);
}

#[tokio::test]
async fn nft_chain_passes_image_url_between_steps() {
    let image_url = spawn_agent(image_meta(), image_run).await;
    let nft_url = spawn_agent(nft_meta(), nft_run).await;
    let harness = make_harness(vec![image_url, nft_url], FailurePolicy::BestEffort);

    let workflow = harness
        .manager
        .create_workflow("mint an nft for finishing the demo", json!({}))
        .await
        .unwrap();
    assert_eq!(workflow.steps.len(), 2);

    let execution = harness
        .manager
        .execute_workflow(&workflow.workflow_id, Some(json!({"prompt": "a demo badge"})))
        .await
        .unwrap();

    assert_eq!(execution.status, ExecutionStatus::Completed);
    let step2 = &execution.step_results[1];
    assert_eq!(step2.status, StepStatus::Completed);
    // The mint step's input carries the image step's output through the
    // workflow variable space.
    assert_eq!(
        step2.input.as_ref().unwrap()["imageUrl"],
        "http://images.example/generated/42.png"
    );
    assert_eq!(
        execution.output.as_ref().unwrap()["mintedFrom"],
        "http://images.example/generated/42.png"
    );
}

#[tokio::test]
async fn failed_step_completes_with_fallback_and_keeps_error() {
    let image_url = spawn_agent(image_meta(), image_run).await;
    let nft_url = spawn_agent(nft_meta(), |_| Err(500)).await;
    let harness = make_harness(vec![image_url, nft_url], FailurePolicy::BestEffort);

    let workflow = harness
        .manager
        .create_workflow("mint an nft", json!({}))
        .await
        .unwrap();

    let execution = harness
        .manager
        .execute_workflow(&workflow.workflow_id, Some(json!({"prompt": "x"})))
        .await
        .unwrap();

    assert_eq!(execution.status, ExecutionStatus::Completed);
    let step2 = &execution.step_results[1];
    assert_eq!(step2.status, StepStatus::Completed);
    assert!(step2.error.is_some(), "original failure must be preserved");
    let output = step2.output.as_ref().unwrap();
    assert_eq!(output["fallback"], true);
    assert_eq!(
        output["transactionHash"],
        "0xdemo123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef"
    );
}

#[tokio::test]
async fn strict_policy_fails_the_execution() {
    let image_url = spawn_agent(image_meta(), |_| Err(500)).await;
    let nft_url = spawn_agent(nft_meta(), nft_run).await;
    let harness = make_harness(vec![image_url, nft_url], FailurePolicy::Strict);

    let workflow = harness
        .manager
        .create_workflow("mint an nft", json!({}))
        .await
        .unwrap();

    let execution = harness
        .manager
        .execute_workflow(&workflow.workflow_id, Some(json!({"prompt": "x"})))
        .await
        .unwrap();

    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert!(execution.error.is_some());
    assert_eq!(execution.step_results[0].status, StepStatus::Failed);
    // The second step never ran.
    assert_eq!(execution.step_results[1].status, StepStatus::Pending);
}

#[tokio::test]
async fn parallel_mode_keys_outputs_by_step_id() {
    let a_url = spawn_agent(greeting_meta("Hello Agent"), greeting_run).await;
    let b_url = spawn_agent(image_meta(), image_run).await;
    let harness = make_harness(vec![a_url.clone(), b_url.clone()], FailurePolicy::BestEffort);

    let workflow = WorkflowDefinition {
        workflow_id: "workflow_parallel".into(),
        name: "Parallel Workflow".into(),
        description: "Workflow for: fan out".into(),
        user_intent: "fan out".into(),
        steps: vec![
            WorkflowStep {
                step_id: "step_1".into(),
                agent_name: "Hello Agent".into(),
                agent_url: a_url,
                description: "greet".into(),
                input_mapping: Default::default(),
                output_mapping: Default::default(),
            },
            WorkflowStep {
                step_id: "step_2".into(),
                agent_name: "DALL-E Image Generator".into(),
                agent_url: b_url,
                description: "draw".into(),
                input_mapping: Default::default(),
                output_mapping: Default::default(),
            },
        ],
        execution_mode: ExecutionMode::Parallel,
        estimated_duration_ms: 10_000,
        created_at: chrono::Utc::now(),
        variables: Default::default(),
    };
    harness.workflows.put(workflow).await;

    let execution = harness
        .manager
        .execute_workflow("workflow_parallel", Some(json!({"name": "Bob"})))
        .await
        .unwrap();

    assert_eq!(execution.status, ExecutionStatus::Completed);
    let output = execution.output.as_ref().unwrap();
    assert_eq!(output["step_1"]["greeting"], "Hello, Bob!");
    assert_eq!(
        output["step_2"]["imageUrl"],
        "http://images.example/generated/42.png"
    );
}

#[tokio::test]
async fn unmapped_step_receives_the_previous_step_output() {
    let image_url = spawn_agent(image_meta(), image_run).await;
    let echo_url = spawn_agent(echo_meta(), echo_run).await;
    let harness = make_harness(
        vec![image_url.clone(), echo_url.clone()],
        FailurePolicy::BestEffort,
    );

    let workflow = WorkflowDefinition {
        workflow_id: "workflow_chain".into(),
        name: "Chain Workflow".into(),
        description: "Workflow for: draw then relay".into(),
        user_intent: "draw then relay".into(),
        steps: vec![
            WorkflowStep {
                step_id: "step_1".into(),
                agent_name: "DALL-E Image Generator".into(),
                agent_url: image_url,
                description: "draw".into(),
                input_mapping: Default::default(),
                output_mapping: Default::default(),
            },
            WorkflowStep {
                step_id: "step_2".into(),
                agent_name: "Echo Agent".into(),
                agent_url: echo_url,
                description: "relay".into(),
                input_mapping: Default::default(),
                output_mapping: Default::default(),
            },
        ],
        execution_mode: ExecutionMode::Sequential,
        estimated_duration_ms: 10_000,
        created_at: chrono::Utc::now(),
        variables: Default::default(),
    };
    harness.workflows.put(workflow).await;

    let execution = harness
        .manager
        .execute_workflow("workflow_chain", Some(json!({"marker": "user"})))
        .await
        .unwrap();

    assert_eq!(execution.status, ExecutionStatus::Completed);
    // With no mapping and no transformer, step 2 gets step 1's raw output,
    // not the caller's input.
    let step2_input = execution.step_results[1].input.as_ref().unwrap();
    assert_eq!(
        step2_input["imageUrl"],
        "http://images.example/generated/42.png"
    );
    assert!(step2_input.get("marker").is_none());
    assert_eq!(
        execution.output.as_ref().unwrap()["imageUrl"],
        "http://images.example/generated/42.png"
    );
}

#[tokio::test]
async fn parallel_failure_fails_the_batch_under_any_policy() {
    let good_url = spawn_agent(image_meta(), image_run).await;
    let bad_url = spawn_agent(nft_meta(), |_| Err(500)).await;
    let harness = make_harness(
        vec![good_url.clone(), bad_url.clone()],
        FailurePolicy::BestEffort,
    );

    let workflow = WorkflowDefinition {
        workflow_id: "workflow_parallel_fail".into(),
        name: "Parallel Workflow".into(),
        description: "Workflow for: fan out".into(),
        user_intent: "fan out".into(),
        steps: vec![
            WorkflowStep {
                step_id: "step_1".into(),
                agent_name: "DALL-E Image Generator".into(),
                agent_url: good_url,
                description: "draw".into(),
                input_mapping: Default::default(),
                output_mapping: Default::default(),
            },
            WorkflowStep {
                step_id: "step_2".into(),
                agent_name: "NFT Deployer".into(),
                agent_url: bad_url,
                description: "deploy".into(),
                input_mapping: Default::default(),
                output_mapping: Default::default(),
            },
        ],
        execution_mode: ExecutionMode::Parallel,
        estimated_duration_ms: 10_000,
        created_at: chrono::Utc::now(),
        variables: Default::default(),
    };
    harness.workflows.put(workflow).await;

    let execution = harness
        .manager
        .execute_workflow("workflow_parallel_fail", Some(json!({"prompt": "x"})))
        .await
        .unwrap();

    // A parallel fan-out has no downstream consumer for a fallback result,
    // so one failed step fails the batch even under best effort.
    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert!(execution.error.is_some());
    assert_eq!(execution.step_results[0].status, StepStatus::Completed);
    assert_eq!(execution.step_results[1].status, StepStatus::Failed);
    assert!(execution.step_results[1].output.is_none());
    assert!(execution.output.is_none());
}

#[tokio::test]
async fn unknown_workflow_is_not_found() {
    let harness = make_harness(vec![], FailurePolicy::BestEffort);
    let err = harness
        .manager
        .execute_workflow("workflow_missing", None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::WorkflowNotFound(_)));
}

#[tokio::test]
async fn missing_input_is_generated_from_the_intent() {
    let url = spawn_agent(greeting_meta("Hello Agent"), greeting_run).await;
    let harness = make_harness(vec![url], FailurePolicy::BestEffort);

    let workflow = harness
        .manager
        .create_workflow("say hello for Carol in french", json!({}))
        .await
        .unwrap();

    let execution = harness
        .manager
        .execute_workflow(&workflow.workflow_id, None)
        .await
        .unwrap();

    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(execution.input["name"], "Carol");
    assert_eq!(execution.input["language"], "french");
}

#[tokio::test]
async fn schema_mismatch_fails_step_without_calling_agent() {
    // "name" is required; an input without it must be rejected client-side.
    let url = spawn_agent(greeting_meta("Hello Agent"), greeting_run).await;
    let harness = make_harness(vec![url], FailurePolicy::Strict);

    let workflow = harness
        .manager
        .create_workflow("say hello", json!({}))
        .await
        .unwrap();

    let execution = harness
        .manager
        .execute_workflow(&workflow.workflow_id, Some(json!({"language": "spanish"})))
        .await
        .unwrap();

    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert!(execution
        .error
        .as_ref()
        .unwrap()
        .to_lowercase()
        .contains("schema"));
}
