//! McpAgentAdapter — makes MCP servers look like ordinary agents.
//!
//! Each running server becomes one `AgentDescriptor::Mcp` whose input schema
//! accepts either a direct `{tool, arguments}` call, a free-text `prompt`, or
//! an arbitrary object routed to the first tool as a last resort. This is the
//! only place that reconciles "agent-shaped" calls with "tool-shaped" calls;
//! the inference heuristic is a single function so it stays replaceable.

use std::sync::Arc;

use serde_json::Value;

use crate::error::OrchestratorError;
use crate::mcp::manager::McpManager;
use crate::models::agent::{AgentDescriptor, McpToolInfo};

pub struct McpAgentAdapter {
    manager: Arc<McpManager>,
}

impl McpAgentAdapter {
    pub fn new(manager: Arc<McpManager>) -> Self {
        Self { manager }
    }

    /// Build one descriptor per running server from its tool list.
    /// Servers whose `tools/list` fails are skipped, not fatal.
    pub async fn descriptors(&self) -> Vec<AgentDescriptor> {
        let mut out = Vec::new();
        for name in self.manager.running_servers().await {
            match self.manager.list_tools(&name).await {
                Ok(tools) => {
                    let resources = self.manager.list_resources(&name).await;
                    out.push(build_descriptor(&name, tools, resources));
                }
                Err(e) => {
                    tracing::warn!("[mcp:{}] could not list tools: {}", name, e);
                }
            }
        }
        out
    }

    /// Execute an agent-shaped call against an MCP descriptor.
    pub async fn run(
        &self,
        descriptor: &AgentDescriptor,
        input: &Value,
    ) -> Result<Value, OrchestratorError> {
        let AgentDescriptor::Mcp {
            server_name, tools, ..
        } = descriptor
        else {
            return Err(OrchestratorError::Internal(
                "McpAgentAdapter::run called with an HTTP descriptor".into(),
            ));
        };

        if tools.is_empty() {
            return Err(OrchestratorError::McpServerUnavailable(format!(
                "no tools available on {server_name}"
            )));
        }

        // Direct tool call: {tool, arguments} (or legacy {tool, args}).
        if let Some(tool) = input.get("tool").and_then(|t| t.as_str()) {
            let args = input
                .get("arguments")
                .or_else(|| input.get("args"))
                .cloned()
                .unwrap_or_else(|| serde_json::json!({}));
            return self.manager.call_tool(server_name, tool, args).await;
        }

        // Prompt routing: single tool takes it verbatim, otherwise the
        // best-guess tool by keyword overlap.
        if let Some(prompt) = input.get("prompt").and_then(|p| p.as_str()) {
            let tool = if tools.len() == 1 {
                &tools[0]
            } else {
                infer_best_tool(tools, prompt)
            };
            return self
                .manager
                .call_tool(server_name, &tool.name, serde_json::json!({"prompt": prompt}))
                .await;
        }

        // Last resort: hand the whole object to the first tool.
        self.manager
            .call_tool(server_name, &tools[0].name, input.clone())
            .await
    }
}

fn build_descriptor(
    server_name: &str,
    tools: Vec<McpToolInfo>,
    resources: Vec<Value>,
) -> AgentDescriptor {
    let tool_names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    AgentDescriptor::Mcp {
        server_name: server_name.to_string(),
        name: server_name.to_string(),
        description: format!("MCP Server: {} with {} tools", server_name, tools.len()),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "tool": {
                    "type": "string",
                    "description": "Tool name to execute",
                    "enum": tool_names,
                },
                "arguments": {
                    "type": "object",
                    "description": "Tool arguments",
                },
                "prompt": {
                    "type": "string",
                    "description": "Free-text request routed to the best-matching tool",
                },
            },
        }),
        output_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "content": {
                    "type": "array",
                    "description": "Tool execution result",
                },
            },
            "required": ["content"],
        }),
        preview_uri: Some(format!("mcp://{server_name}")),
        tools,
        resources,
    }
}

/// Pick the tool whose name or description overlaps the prompt the most.
///
/// Exact name containment wins; otherwise any description word longer than
/// three characters that appears in the prompt selects that tool; the first
/// tool is the fallback. Deliberately simple — swap this out before relying
/// on it for anything beyond demo routing.
fn infer_best_tool<'a>(tools: &'a [McpToolInfo], prompt: &str) -> &'a McpToolInfo {
    let prompt_lower = prompt.to_lowercase();

    for tool in tools {
        if prompt_lower.contains(&tool.name.to_lowercase()) {
            return tool;
        }
    }

    for tool in tools {
        for word in tool.description.to_lowercase().split_whitespace() {
            if word.len() > 3 && prompt_lower.contains(word) {
                return tool;
            }
        }
    }

    &tools[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(name: &str, description: &str) -> McpToolInfo {
        McpToolInfo {
            name: name.into(),
            description: description.into(),
            input_schema: None,
        }
    }

    #[test]
    fn infer_prefers_exact_name_match() {
        let tools = vec![
            tool("put_object", "Store an object in the bucket"),
            tool("get_object", "Fetch an object from the bucket"),
        ];
        let t = infer_best_tool(&tools, "please get_object for key foo");
        assert_eq!(t.name, "get_object");
    }

    #[test]
    fn infer_falls_back_to_description_keywords() {
        let tools = vec![
            tool("op_a", "Render charts and graphs"),
            tool("op_b", "Translate text between languages"),
        ];
        let t = infer_best_tool(&tools, "translate this sentence to french");
        assert_eq!(t.name, "op_b");
    }

    #[test]
    fn infer_defaults_to_first_tool() {
        let tools = vec![tool("alpha", "x y z"), tool("beta", "q r s")];
        let t = infer_best_tool(&tools, "nothing in common");
        assert_eq!(t.name, "alpha");
    }

    #[test]
    fn descriptor_enumerates_tools_in_schema() {
        let d = build_descriptor("akave", vec![tool("put_object", ""), tool("get_object", "")], vec![]);
        let schema = d.input_schema();
        let names = schema["properties"]["tool"]["enum"].as_array().unwrap();
        assert_eq!(names.len(), 2);
        assert_eq!(d.url(), "mcp://akave");
    }
}
