//! Core error type for the MAHA orchestrator.
//!
//! `OrchestratorError` is used throughout the core domain (registry, MCP,
//! planner, workflow engine, job runner). When the `axum` feature is enabled,
//! it also implements `IntoResponse` so it can be used directly as an axum
//! handler error type.

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("Schema mismatch for {agent}: {detail}")]
    SchemaMismatch { agent: String, detail: String },

    #[error("Agent unavailable: {0}")]
    AgentUnavailable(String),

    #[error("MCP server not available: {0}")]
    McpServerUnavailable(String),

    #[error("MCP request timeout: {method} on {server} after {timeout_ms}ms")]
    McpRequestTimeout {
        server: String,
        method: String,
        timeout_ms: u64,
    },

    #[error("Planning failure: {0}")]
    PlanningFailure(String),

    #[error("Workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error("Execution not found: {0}")]
    ExecutionNotFound(String),

    #[error("Settlement failure: {0}")]
    SettlementFailure(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OrchestratorError {
    /// Stable machine-readable error code, used in API bodies and step records.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SchemaMismatch { .. } => "schema_mismatch",
            Self::AgentUnavailable(_) => "agent_unavailable",
            Self::McpServerUnavailable(_) => "mcp_server_unavailable",
            Self::McpRequestTimeout { .. } => "mcp_request_timeout",
            Self::PlanningFailure(_) => "planning_failure",
            Self::WorkflowNotFound(_) => "workflow_not_found",
            Self::ExecutionNotFound(_) => "execution_not_found",
            Self::SettlementFailure(_) => "settlement_failure",
            Self::BadRequest(_) => "bad_request",
            Self::Internal(_) => "internal",
        }
    }
}

// ---------------------------------------------------------------------------
// axum integration (opt-in via feature flag)
// ---------------------------------------------------------------------------

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for OrchestratorError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = match &self {
            OrchestratorError::SchemaMismatch { .. } | OrchestratorError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            OrchestratorError::WorkflowNotFound(_) | OrchestratorError::ExecutionNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            OrchestratorError::AgentUnavailable(_)
            | OrchestratorError::McpServerUnavailable(_)
            | OrchestratorError::SettlementFailure(_) => StatusCode::BAD_GATEWAY,
            OrchestratorError::McpRequestTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            OrchestratorError::PlanningFailure(_) | OrchestratorError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = serde_json::json!({
            "error": self.to_string(),
            "code": self.code(),
        });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        let err = OrchestratorError::SchemaMismatch {
            agent: "dalle".into(),
            detail: "missing field".into(),
        };
        assert_eq!(err.code(), "schema_mismatch");
        assert_eq!(
            OrchestratorError::WorkflowNotFound("w1".into()).code(),
            "workflow_not_found"
        );
    }
}
