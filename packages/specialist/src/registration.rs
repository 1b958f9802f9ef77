// ABOUTME: Registry client for specialist agents
// ABOUTME: Initial registration, periodic heartbeat renewal and shutdown deregistration

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::{info, warn};

use aviary_core::{RegisterRequest, ToolSpec};

const REGISTRY_TIMEOUT: Duration = Duration::from_secs(3);

/// Registers this agent with the registry and keeps the registration alive.
///
/// Every call is best-effort: a failed heartbeat is logged and retried on
/// the next tick, never fatal. The registry TTL decides liveness.
pub struct RegistryClient {
    client: Client,
    register_url: String,
    deregister_url: String,
    request: RegisterRequest,
}

impl RegistryClient {
    pub fn new(
        registry_base_url: &str,
        agent_id: &str,
        base_url: &str,
        tools: Vec<ToolSpec>,
        secret_token: &str,
    ) -> Self {
        let client = Client::builder()
            .timeout(REGISTRY_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        let registry = registry_base_url.trim_end_matches('/');
        Self {
            client,
            register_url: format!("{registry}/register"),
            deregister_url: format!("{registry}/deregister"),
            request: RegisterRequest {
                agent_id: agent_id.to_string(),
                base_url: base_url.to_string(),
                tools,
                secret_token: secret_token.to_string(),
            },
        }
    }

    /// Register or renew (heartbeat) this agent.
    pub async fn register(&self) {
        let result = self
            .client
            .post(&self.register_url)
            .json(&self.request)
            .send()
            .await
            .and_then(|response| response.error_for_status());

        match result {
            Ok(_) => info!(
                "Registration/heartbeat for '{}' accepted by the registry",
                self.request.agent_id
            ),
            Err(e) => warn!(
                "Registration/heartbeat for '{}' failed: {e}",
                self.request.agent_id
            ),
        }
    }

    /// Remove this agent from the registry on shutdown.
    pub async fn deregister(&self) {
        let result = self
            .client
            .post(&self.deregister_url)
            .json(&serde_json::json!({ "agent_id": self.request.agent_id }))
            .send()
            .await;

        match result {
            Ok(_) => info!("Agent '{}' deregistered", self.request.agent_id),
            Err(e) => warn!(
                "Failed to deregister '{}' on shutdown: {e}",
                self.request.agent_id
            ),
        }
    }
}

/// Renew the registration on a fixed cadence (kept under the registry TTL).
pub fn spawn_heartbeat(client: Arc<RegistryClient>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(every).await;
            client.register().await;
        }
    })
}
