//! Rule-based fallback planner.
//!
//! Deterministic keyword-pattern matching over the user intent. This path
//! preserves availability when the LLM planner is unavailable or produces an
//! invalid plan; it trades plan quality for predictability. The keyword sets
//! are configuration data, not code — deployments can override them without
//! touching the matcher. The fallback never errors: with no matching pattern
//! it returns an empty plan.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::agent::AgentDescriptor;
use crate::models::workflow::WorkflowStep;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlannerRules {
    /// Intent keywords that signal a greeting request.
    pub greeting_keywords: Vec<String>,
    /// Intent keywords that signal an image-generation request.
    pub image_keywords: Vec<String>,
    /// Intent keywords that signal an NFT mint request.
    pub nft_keywords: Vec<String>,
    /// Substrings identifying a greeting-capable agent by name.
    pub greeting_agent_markers: Vec<String>,
    /// Substrings identifying an image-capable agent by name.
    pub image_agent_markers: Vec<String>,
    /// Substrings identifying an NFT-capable agent by name.
    pub nft_agent_markers: Vec<String>,
}

impl Default for PlannerRules {
    fn default() -> Self {
        Self {
            greeting_keywords: strings(&["hello", "greet"]),
            image_keywords: strings(&["image", "picture", "generate"]),
            nft_keywords: strings(&["nft", "mint"]),
            greeting_agent_markers: strings(&["hello", "greet"]),
            image_agent_markers: strings(&["image", "dall"]),
            nft_agent_markers: strings(&["nft", "deploy", "mint"]),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl PlannerRules {
    fn intent_matches(&self, intent: &str, keywords: &[String]) -> bool {
        keywords.iter().any(|k| intent.contains(k.as_str()))
    }

    fn find_agent<'a>(
        &self,
        agents: &'a [AgentDescriptor],
        markers: &[String],
    ) -> Option<&'a AgentDescriptor> {
        agents.iter().find(|a| {
            let name = a.name().to_lowercase();
            markers.iter().any(|m| name.contains(m.as_str()))
        })
    }
}

pub struct RulePlanner {
    rules: PlannerRules,
}

impl RulePlanner {
    pub fn new(rules: PlannerRules) -> Self {
        Self { rules }
    }

    /// Produce a plan from keyword patterns alone. Empty when nothing fits.
    pub fn plan(&self, intent: &str, agents: &[AgentDescriptor]) -> Vec<WorkflowStep> {
        let intent = intent.to_lowercase();
        let rules = &self.rules;

        let wants_nft = rules.intent_matches(&intent, &rules.nft_keywords);
        let wants_greeting = rules.intent_matches(&intent, &rules.greeting_keywords);
        let wants_image = rules.intent_matches(&intent, &rules.image_keywords);

        let greeting_agent = rules.find_agent(agents, &rules.greeting_agent_markers);
        let image_agent = rules.find_agent(agents, &rules.image_agent_markers);
        let nft_agent = rules.find_agent(agents, &rules.nft_agent_markers);

        // Fixed two-step image → mint plan, chained through the image URL.
        if wants_nft {
            if let (Some(image), Some(nft)) = (image_agent, nft_agent) {
                return vec![
                    step(
                        "step_1",
                        image,
                        "Generate artwork for the NFT",
                        &[("prompt", "prompt")],
                        &[("imageUrl", "generatedImageUrl")],
                    ),
                    step(
                        "step_2",
                        nft,
                        "Mint NFT with the generated artwork",
                        &[
                            ("imageUrl", "generatedImageUrl"),
                            ("collectionName", "AI Generated Collection"),
                            ("tokenName", "AI NFT"),
                        ],
                        &[("transactionHash", "mintTransaction")],
                    ),
                ];
            }
        }

        if wants_greeting && wants_image {
            if let (Some(greeting), Some(image)) = (greeting_agent, image_agent) {
                return vec![
                    step(
                        "step_1",
                        greeting,
                        "Generate personalized greeting",
                        &[("name", "userInput"), ("language", "userInput")],
                        &[("greeting", "generatedGreeting")],
                    ),
                    step(
                        "step_2",
                        image,
                        "Generate image based on greeting",
                        &[("prompt", "generatedGreeting")],
                        &[("imageUrl", "finalImage")],
                    ),
                ];
            }
        }

        if wants_image {
            if let Some(image) = image_agent {
                return vec![step(
                    "step_1",
                    image,
                    "Generate image",
                    &[],
                    &[("imageUrl", "generatedImage")],
                )];
            }
        }

        if wants_greeting {
            if let Some(greeting) = greeting_agent {
                // No mapping: the user input already matches the agent shape.
                return vec![step(
                    "step_1",
                    greeting,
                    "Generate greeting",
                    &[],
                    &[("greeting", "personalizedGreeting")],
                )];
            }
        }

        // Last resort: a single step against the first available agent.
        if let Some(agent) = agents.first() {
            return vec![step("step_1", agent, "Process request", &[], &[])];
        }

        Vec::new()
    }
}

fn step(
    step_id: &str,
    agent: &AgentDescriptor,
    description: &str,
    input_mapping: &[(&str, &str)],
    output_mapping: &[(&str, &str)],
) -> WorkflowStep {
    let to_map = |pairs: &[(&str, &str)]| {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>()
    };
    WorkflowStep {
        step_id: step_id.to_string(),
        agent_name: agent.name().to_string(),
        agent_url: agent.url(),
        description: description.to_string(),
        input_mapping: to_map(input_mapping),
        output_mapping: to_map(output_mapping),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn http_agent(name: &str) -> AgentDescriptor {
        AgentDescriptor::Http {
            url: format!("https://{}.example", name.to_lowercase()),
            name: name.into(),
            description: String::new(),
            wallet: None,
            category: None,
            tags: vec![],
            input_schema: json!({"type": "object"}),
            output_schema: json!({"type": "object"}),
            preview_uri: None,
        }
    }

    #[test]
    fn nft_intent_yields_image_then_mint() {
        let agents = vec![http_agent("DALL-E Image Generator"), http_agent("NFT Deployer")];
        let planner = RulePlanner::new(PlannerRules::default());

        let steps = planner.plan("mint an nft for finishing the demo", &agents);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].agent_name, "DALL-E Image Generator");
        assert_eq!(steps[1].agent_name, "NFT Deployer");
        // The mint step consumes the image step's output variable.
        assert_eq!(
            steps[1].input_mapping.get("imageUrl").map(String::as_str),
            Some("generatedImageUrl")
        );
        assert_eq!(
            steps[0].output_mapping.get("imageUrl").map(String::as_str),
            Some("generatedImageUrl")
        );
    }

    #[test]
    fn greeting_plus_image_chains_greeting_into_prompt() {
        let agents = vec![http_agent("Hello Agent"), http_agent("Image Studio")];
        let planner = RulePlanner::new(PlannerRules::default());
        let steps = planner.plan("say hello and generate a picture", &agents);
        assert_eq!(steps.len(), 2);
        assert_eq!(
            steps[1].input_mapping.get("prompt").map(String::as_str),
            Some("generatedGreeting")
        );
    }

    #[test]
    fn no_agents_means_empty_plan() {
        let planner = RulePlanner::new(PlannerRules::default());
        assert!(planner.plan("mint an nft", &[]).is_empty());
    }

    #[test]
    fn unmatched_intent_uses_first_agent() {
        let agents = vec![http_agent("Watermarker")];
        let planner = RulePlanner::new(PlannerRules::default());
        let steps = planner.plan("do something unusual", &agents);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].agent_name, "Watermarker");
    }
}
