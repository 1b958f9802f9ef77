// ABOUTME: Health-gated dispatch of A2A messages to specialist agents
// ABOUTME: Probe failures trigger best-effort deregistration and a 503, never a forward

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use aviary_core::A2AMessage;

use crate::discovery::DiscoverySnapshot;
use crate::routing::RoutingDecision;

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);
const FORWARD_TIMEOUT: Duration = Duration::from_secs(30);
const REGISTRY_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Error, Debug)]
pub enum DispatchError {
    /// Operator error: the host has no credential for an agent it routed to.
    #[error("Internal security error: no credential configured for agent '{0}'.")]
    MissingCredential(String),

    /// The routed agent vanished between discovery and dispatch.
    #[error("Data for agent '{0}' was not found.")]
    UnknownAgent(String),

    /// Health probe failed; the A2A message was not forwarded.
    #[error("The specialist agent '{0}' is unavailable right now. Please try again later.")]
    Unavailable(String),

    /// The specialist was reachable but answered with an error; upstream
    /// status and body are preserved for diagnosis.
    #[error("Error communicating with the specialist agent: {status} {body}")]
    Upstream { status: u16, body: String },

    #[error("Error communicating with the specialist agent: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Structured passthrough of a specialist's `/execute` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecialistReply {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub sources: Option<Vec<String>>,
    #[serde(default)]
    pub chosen_temperature: Option<f32>,
    #[serde(default)]
    pub similarity: Option<f32>,
}

/// Forwards routed queries to specialists with a liveness gate in front.
pub struct Dispatcher {
    host_agent_id: String,
    registry_base_url: String,
    secrets: HashMap<String, String>,
    probe_client: Client,
    forward_client: Client,
    registry_client: Client,
}

impl Dispatcher {
    pub fn new(
        host_agent_id: &str,
        registry_base_url: &str,
        secrets: HashMap<String, String>,
    ) -> Self {
        let build = |timeout: Duration| {
            Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to build HTTP client")
        };

        Self {
            host_agent_id: host_agent_id.to_string(),
            registry_base_url: registry_base_url.trim_end_matches('/').to_string(),
            secrets,
            probe_client: build(PROBE_TIMEOUT),
            forward_client: build(FORWARD_TIMEOUT),
            registry_client: build(REGISTRY_TIMEOUT),
        }
    }

    pub fn host_agent_id(&self) -> &str {
        &self.host_agent_id
    }

    /// Dispatch a routed query: credential lookup, liveness probe, forward.
    ///
    /// A failed probe is terminal for this request: it spawns a best-effort
    /// deregistration and returns `Unavailable` without the message ever
    /// leaving the host.
    pub async fn dispatch(
        &self,
        decision: &RoutingDecision,
        snapshot: &DiscoverySnapshot,
        message: &A2AMessage,
    ) -> Result<SpecialistReply, DispatchError> {
        let agent_id = &decision.owner_agent_id;

        let secret = self
            .secrets
            .get(agent_id)
            .ok_or_else(|| DispatchError::MissingCredential(agent_id.clone()))?;

        let listing = snapshot
            .agents
            .get(agent_id)
            .ok_or_else(|| DispatchError::UnknownAgent(agent_id.clone()))?;

        let health_url = format!("{}/health", listing.base_url.trim_end_matches('/'));
        info!("Probing health of agent '{agent_id}' at {health_url}");
        let healthy = match self.probe_client.get(&health_url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!("Health probe for '{agent_id}' failed: {e}");
                false
            }
        };

        if !healthy {
            self.spawn_deregister(agent_id.clone());
            return Err(DispatchError::Unavailable(agent_id.clone()));
        }

        info!("Agent '{agent_id}' is healthy; delegating task");
        let response = self
            .forward_client
            .post(&decision.execute_url)
            .bearer_auth(secret)
            .json(message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }

    /// Fire-and-forget deregistration of an agent that failed its probe.
    /// Its own failure is only logged, never escalated to the caller.
    fn spawn_deregister(&self, agent_id: String) {
        let client = self.registry_client.clone();
        let url = format!("{}/deregister", self.registry_base_url);
        let host_agent_id = self.host_agent_id.clone();

        info!("Agent '{agent_id}' failed its health check; requesting deregistration");
        tokio::spawn(async move {
            let result = client
                .post(&url)
                .json(&serde_json::json!({ "agent_id": agent_id }))
                .send()
                .await;
            match result {
                Ok(response) if response.status().is_success() => {
                    info!("HOST ({host_agent_id}): agent '{agent_id}' deregistered from the registry");
                }
                Ok(response) => {
                    warn!(
                        "HOST ({host_agent_id}): registry answered {} while deregistering '{agent_id}'",
                        response.status()
                    );
                }
                Err(e) => {
                    warn!("HOST ({host_agent_id}): failed to reach the registry to deregister '{agent_id}': {e}");
                }
            }
        });
    }
}
