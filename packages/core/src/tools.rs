// ABOUTME: Tool advertisement schema and registry request/response payloads
// ABOUTME: Secrets travel only in RegisterRequest; listings never carry them

use serde::{Deserialize, Serialize};

/// A capability an agent advertises to the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// Free-form parameter schema, opaque to the registry and host.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub parameters: serde_json::Value,
}

/// Registration (and heartbeat renewal) body for `POST /register`.
///
/// All fields default so presence can be validated with a uniform 400
/// instead of a deserialization rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub agent_id: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub tools: Vec<ToolSpec>,
    #[serde(default)]
    pub secret_token: String,
}

/// Public projection of a registered agent, as returned by `GET /list_agents`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentListing {
    pub base_url: String,
    pub tools: Vec<ToolSpec>,
}
