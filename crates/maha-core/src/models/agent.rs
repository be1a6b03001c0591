//! Agent capability descriptors.
//!
//! An agent is either an HTTP service speaking the `/meta` + `/run` contract
//! or an MCP subprocess server whose tool list is wrapped into the same
//! descriptor shape. Descriptors are immutable once fetched — re-discovery
//! replaces the whole record, nothing is mutated in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The raw capability document served from `GET {baseUrl}/meta`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMeta {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// On-chain payment wallet, when the agent participates in settlement.
    #[serde(default)]
    pub wallet: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub input_schema: Value,
    pub output_schema: Value,
    #[serde(rename = "previewURI", default)]
    pub preview_uri: Option<String>,
}

/// One tool exposed by an MCP server (`tools/list` entry).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpToolInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub input_schema: Option<Value>,
}

/// Capability descriptor for a discovered agent, tagged by transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
#[serde(rename_all_fields = "camelCase")]
pub enum AgentDescriptor {
    Http {
        url: String,
        name: String,
        description: String,
        wallet: Option<String>,
        category: Option<String>,
        #[serde(default)]
        tags: Vec<String>,
        input_schema: Value,
        output_schema: Value,
        #[serde(rename = "previewURI")]
        preview_uri: Option<String>,
    },
    Mcp {
        server_name: String,
        name: String,
        description: String,
        tools: Vec<McpToolInfo>,
        #[serde(default)]
        resources: Vec<Value>,
        input_schema: Value,
        output_schema: Value,
        #[serde(rename = "previewURI")]
        preview_uri: Option<String>,
    },
}

impl AgentDescriptor {
    pub fn name(&self) -> &str {
        match self {
            Self::Http { name, .. } | Self::Mcp { name, .. } => name,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Self::Http { description, .. } | Self::Mcp { description, .. } => description,
        }
    }

    /// Address of the agent. MCP servers get a virtual `mcp://` URL so they
    /// can stand wherever a URL is expected.
    pub fn url(&self) -> String {
        match self {
            Self::Http { url, .. } => url.clone(),
            Self::Mcp { server_name, .. } => format!("mcp://{server_name}"),
        }
    }

    pub fn input_schema(&self) -> &Value {
        match self {
            Self::Http { input_schema, .. } | Self::Mcp { input_schema, .. } => input_schema,
        }
    }

    pub fn output_schema(&self) -> &Value {
        match self {
            Self::Http { output_schema, .. } | Self::Mcp { output_schema, .. } => output_schema,
        }
    }

    pub fn wallet(&self) -> Option<&str> {
        match self {
            Self::Http { wallet, .. } => wallet.as_deref(),
            Self::Mcp { .. } => None,
        }
    }
}

/// Whether a URL points at an MCP-backed virtual agent.
pub fn is_mcp_url(url: &str) -> bool {
    url.starts_with("mcp://")
}

/// Extract the server name from an `mcp://` URL.
pub fn mcp_server_name(url: &str) -> Option<&str> {
    url.strip_prefix("mcp://")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentHealthStatus {
    Healthy,
    Unhealthy,
    Unknown,
}

/// Best-effort liveness probe result (`GET {baseUrl}/health`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentHealth {
    pub url: String,
    pub status: AgentHealthStatus,
    pub response_time_ms: Option<u64>,
    pub last_checked: DateTime<Utc>,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mcp_urls_roundtrip() {
        assert!(is_mcp_url("mcp://akave"));
        assert!(!is_mcp_url("https://dalle3.example.net"));
        assert_eq!(mcp_server_name("mcp://akave"), Some("akave"));
    }

    #[test]
    fn descriptor_serializes_with_transport_tag() {
        let d = AgentDescriptor::Http {
            url: "https://hello.example".into(),
            name: "Hello".into(),
            description: "greeter".into(),
            wallet: None,
            category: None,
            tags: vec![],
            input_schema: json!({"type": "object"}),
            output_schema: json!({"type": "object"}),
            preview_uri: None,
        };
        let v = serde_json::to_value(&d).unwrap();
        assert_eq!(v["type"], "http");
        assert_eq!(v["inputSchema"]["type"], "object");
    }
}
