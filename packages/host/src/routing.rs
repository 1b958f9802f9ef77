// ABOUTME: Heuristic query router over the discovery snapshot
// ABOUTME: Routing policy is data (keyword sets per domain), not code

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::discovery::DiscoverySnapshot;

/// Default routing policy compiled into the binary; override with
/// `ROUTING_POLICY_PATH` to change keyword sets without rebuilding.
pub const DEFAULT_POLICY_JSON: &str = include_str!("../config/routing.json");

/// Sentence used when the registry has no live agents at all.
pub const EMPTY_REGISTRY_TEXT: &str = "There are no agents registered in the system right now.";

/// Prefix used when routing found no suitable tool and the host falls back
/// to introducing itself and listing what is available.
pub const FALLBACK_PREFIX: &str = "Hello! I am the host agent. I take your question, pick the most suitable specialist and forward the request.\nWhen no specialist fits, I can show you who is available right now:\n\n";

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("Failed to read routing policy: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid routing policy: {0}")]
    Json(#[from] serde_json::Error),
}

/// One routable domain: a keyword set that recognizes the query and the
/// substrings that identify a matching tool name or description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainRule {
    pub domain: String,
    pub keywords: Vec<String>,
    pub tool_markers: Vec<String>,
}

/// Ordered routing rules plus the privileged capabilities-query keywords.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingPolicy {
    pub capability_keywords: Vec<String>,
    pub rules: Vec<DomainRule>,
}

impl RoutingPolicy {
    pub fn embedded_default() -> Self {
        serde_json::from_str(DEFAULT_POLICY_JSON).expect("embedded routing policy is valid JSON")
    }

    pub fn from_file(path: &str) -> Result<Self, PolicyError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Where a query should go. Ephemeral, produced per request.
#[derive(Debug, Clone, Serialize)]
pub struct RoutingDecision {
    pub tool_name: String,
    pub owner_agent_id: String,
    pub execute_url: String,
}

/// Lower-case and strip punctuation so keyword membership tests see word
/// boundaries as single spaces (keywords like " ia " rely on the padding).
fn normalize(query: &str) -> String {
    let lowered = query.to_lowercase();
    let cleaned: String = lowered
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();
    format!(" {cleaned} ")
}

/// Deterministic, stateless routing: first rule whose keyword set matches,
/// then the first snapshot-order tool carrying one of the rule's markers.
/// No scoring, no ranking; ties resolve by snapshot iteration order.
pub fn route(
    query: &str,
    snapshot: &DiscoverySnapshot,
    policy: &RoutingPolicy,
) -> Option<RoutingDecision> {
    if query.trim().is_empty() || snapshot.tools.is_empty() {
        return None;
    }

    let normalized = normalize(query);

    for rule in &policy.rules {
        if !rule.keywords.iter().any(|k| normalized.contains(k.as_str())) {
            continue;
        }
        for tool in &snapshot.tools {
            let name = tool.name.to_lowercase();
            let description = tool.description.to_lowercase();
            if rule
                .tool_markers
                .iter()
                .any(|m| name.contains(m.as_str()) || description.contains(m.as_str()))
            {
                return Some(RoutingDecision {
                    tool_name: tool.name.clone(),
                    owner_agent_id: tool.owner_agent_id.clone(),
                    execute_url: tool.execute_url.clone(),
                });
            }
        }
    }

    None
}

/// Privileged query shape that bypasses routing and returns the full
/// discovered capability list.
pub fn is_capabilities_query(query: &str, policy: &RoutingPolicy) -> bool {
    let text = query.trim().to_lowercase();
    if text.is_empty() {
        return false;
    }
    policy
        .capability_keywords
        .iter()
        .any(|k| text.contains(k.as_str()))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSummary {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCapabilities {
    pub agent_id: String,
    pub base_url: String,
    pub tools: Vec<ToolSummary>,
}

/// Structured and human-readable view of everything currently discovered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilitiesResponse {
    pub answer: String,
    pub agents: Vec<AgentCapabilities>,
}

/// Build the capabilities listing from a snapshot, grouped per agent in
/// stable (sorted) order.
pub fn capabilities_response(snapshot: &DiscoverySnapshot) -> CapabilitiesResponse {
    let mut agent_ids: Vec<&String> = snapshot.agents.keys().collect();
    agent_ids.sort();

    let agents: Vec<AgentCapabilities> = agent_ids
        .into_iter()
        .map(|agent_id| {
            let listing = &snapshot.agents[agent_id];
            AgentCapabilities {
                agent_id: agent_id.clone(),
                base_url: listing.base_url.clone(),
                tools: listing
                    .tools
                    .iter()
                    .map(|tool| ToolSummary {
                        name: tool.name.clone(),
                        description: tool.description.clone(),
                    })
                    .collect(),
            }
        })
        .collect();

    let answer = if agents.is_empty() {
        EMPTY_REGISTRY_TEXT.to_string()
    } else {
        let mut lines = vec!["I can coordinate the following agents and tools:".to_string()];
        for agent in &agents {
            lines.push(format!("- {}", agent.agent_id));
            for tool in &agent.tools {
                lines.push(format!("    \u{2022} {}: {}", tool.name, tool.description));
            }
        }
        lines.join("\n")
    };

    CapabilitiesResponse { answer, agents }
}
