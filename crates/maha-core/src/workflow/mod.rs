//! Workflow execution engine.

pub mod fallback;
pub mod manager;
pub mod mapping;
pub mod transform;

pub use fallback::{fallback_output, FALLBACK_ERROR_PREFIX};
pub use manager::{generate_default_input, FailurePolicy, WorkflowManager};
pub use mapping::{apply_output_mapping, map_step_input};
pub use transform::{LlmTransformer, StepTransformer, TransformContext};
