//! MAHA Core — transport-agnostic domain logic for the MAHA orchestrator.
//!
//! This crate contains the orchestration core: agent discovery and schema
//! registry, the MCP subprocess protocol manager, LLM-assisted and rule-based
//! workflow planning, the workflow execution state machine, the low-level job
//! runner and the settlement ledger interface. It has **no HTTP framework
//! dependency** by default, making it suitable for use in:
//!
//! - HTTP servers (via `maha-server`)
//! - CLI tools and integration tests
//!
//! # Feature Flags
//!
//! - `axum` — Enables `IntoResponse` impl on `OrchestratorError` for use in
//!   axum handlers.

pub mod config;
pub mod error;
pub mod mcp;
pub mod models;
pub mod planner;
pub mod registry;
pub mod runner;
pub mod settlement;
pub mod state;
pub mod store;
pub mod workflow;

// Convenience re-exports
pub use error::OrchestratorError;
pub use state::{AppState, AppStateInner};
