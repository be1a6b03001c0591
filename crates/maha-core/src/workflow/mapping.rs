//! Static input/output mapping between workflow steps.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::models::workflow::WorkflowStep;

/// Resolve a step's input from its declared mapping.
///
/// Each `(input_key, source)` pair resolves in order:
/// 1. a workflow variable named `source`;
/// 2. the literal `"userInput"`, which takes `default_input[input_key]`
///    when present and the whole user input otherwise;
/// 3. a key named `source` inside the user input object;
/// 4. failing all of those, `source` itself as a literal string value.
///
/// A step with no mapping receives the user input unchanged.
pub fn map_step_input(
    step: &WorkflowStep,
    variables: &HashMap<String, Value>,
    default_input: &Value,
) -> Value {
    if step.input_mapping.is_empty() {
        return default_input.clone();
    }

    let mut mapped = Map::new();
    for (input_key, source) in &step.input_mapping {
        let resolved = if let Some(value) = variables.get(source) {
            value.clone()
        } else if source == "userInput" {
            default_input
                .get(input_key)
                .cloned()
                .unwrap_or_else(|| default_input.clone())
        } else if let Some(value) = default_input.get(source) {
            value.clone()
        } else {
            Value::String(source.clone())
        };
        mapped.insert(input_key.clone(), resolved);
    }
    Value::Object(mapped)
}

/// Copy declared output fields into the workflow variable space so later
/// steps can reference them. Missing fields are skipped silently.
pub fn apply_output_mapping(
    step: &WorkflowStep,
    output: &Value,
    variables: &mut HashMap<String, Value>,
) {
    for (output_key, variable) in &step.output_mapping {
        if let Some(value) = output.get(output_key) {
            variables.insert(variable.clone(), value.clone());
        }
    }
}
