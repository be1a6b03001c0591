pub mod agent;
pub mod job;
pub mod workflow;

pub use agent::{AgentDescriptor, AgentHealth, AgentHealthStatus, AgentMeta, McpToolInfo};
pub use job::{JobConfig, JobResult, TaskResult};
pub use workflow::{
    ExecutionMode, ExecutionStatus, StepResult, StepStatus, WorkflowDefinition, WorkflowExecution,
    WorkflowStep,
};
