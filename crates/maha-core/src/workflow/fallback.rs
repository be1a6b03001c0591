//! Category-aware demo fallbacks for failed steps.
//!
//! Under the best-effort policy a failed step produces a plausible
//! placeholder result so downstream steps and demos keep moving. The
//! category is inferred from the agent name; the original error is
//! preserved alongside the placeholder.

use serde_json::{json, Value};

const FALLBACK_IMAGE_URL: &str =
    "https://via.placeholder.com/1024x1024/FF5484/FFFFFF?text=Demo+NFT+Image";
const FALLBACK_TX_HASH: &str =
    "0xdemo123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";
const FALLBACK_CONTRACT: &str = "0xDemo1234567890123456789012345678901234567890";
const FALLBACK_RECIPIENT: &str = "0x742d35Cc6634C0532925a3b8D4C9db96590b5c8e";
const FALLBACK_METADATA_URI: &str = "https://demo.metadata.uri/1";

pub const FALLBACK_ERROR_PREFIX: &str = "Agent failed, using fallback: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AgentCategory {
    ImageGeneration,
    NftDeployment,
    Generic,
}

fn categorize(agent_name: &str) -> AgentCategory {
    let name = agent_name.to_lowercase();
    if name.contains("dall-e") || name.contains("image") {
        AgentCategory::ImageGeneration
    } else if name.contains("nft") || name.contains("deployer") {
        AgentCategory::NftDeployment
    } else {
        AgentCategory::Generic
    }
}

/// Placeholder output for a failed step, shaped like the real agent's
/// output so downstream output mappings still resolve.
pub fn fallback_output(agent_name: &str, input: &Value, error: &str) -> Value {
    let error_text = format!("{FALLBACK_ERROR_PREFIX}{error}");
    match categorize(agent_name) {
        AgentCategory::ImageGeneration => json!({
            "imageUrl": FALLBACK_IMAGE_URL,
            "prompt": input.get("prompt").cloned().unwrap_or(Value::Null),
            "fallback": true,
            "error": error_text,
        }),
        AgentCategory::NftDeployment => json!({
            "transactionHash": FALLBACK_TX_HASH,
            "contractAddress": FALLBACK_CONTRACT,
            "recipient": FALLBACK_RECIPIENT,
            "metadataUri": FALLBACK_METADATA_URI,
            "tokenId": 1,
            "fallback": true,
            "error": error_text,
        }),
        AgentCategory::Generic => json!({
            "message": "Task completed with fallback handler",
            "input": input,
            "fallback": true,
            "error": error_text,
        }),
    }
}
