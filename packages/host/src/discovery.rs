// ABOUTME: Host-side discovery cache over the registry's list_agents endpoint
// ABOUTME: Snapshots are immutable values swapped wholesale; refresh failures retain the last one

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::sync::RwLock;
use tracing::{info, warn};

use aviary_core::AgentListing;

/// One discovered capability, flattened from an agent's tool list.
#[derive(Debug, Clone)]
pub struct DiscoveredTool {
    pub name: String,
    pub description: String,
    pub owner_agent_id: String,
    pub execute_url: String,
}

/// Immutable point-in-time view of all live agents and their tools.
///
/// Built wholesale on every refresh and never mutated, so concurrent readers
/// always see either the previous complete snapshot or the new one.
#[derive(Debug, Default)]
pub struct DiscoverySnapshot {
    pub tools: Vec<DiscoveredTool>,
    pub agents: HashMap<String, AgentListing>,
}

impl DiscoverySnapshot {
    pub fn from_listings(listings: HashMap<String, AgentListing>) -> Self {
        let mut tools = Vec::new();
        // Flatten in sorted agent order so snapshot iteration order is stable
        // across refreshes; ties in routing resolve by this order.
        let mut agent_ids: Vec<&String> = listings.keys().collect();
        agent_ids.sort();
        for agent_id in agent_ids {
            let listing = &listings[agent_id];
            for tool in &listing.tools {
                tools.push(DiscoveredTool {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    owner_agent_id: agent_id.clone(),
                    execute_url: format!("{}/execute", listing.base_url.trim_end_matches('/')),
                });
            }
        }
        Self {
            tools,
            agents: listings,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Periodically refreshed view of the registry, consumed by the router.
pub struct DiscoveryCache {
    client: Client,
    list_url: String,
    retry_delay: Duration,
    snapshot: RwLock<Arc<DiscoverySnapshot>>,
}

impl DiscoveryCache {
    pub fn new(registry_base_url: &str, retry_delay: Duration) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(3))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            list_url: format!("{}/list_agents", registry_base_url.trim_end_matches('/')),
            retry_delay,
            snapshot: RwLock::new(Arc::new(DiscoverySnapshot::default())),
        }
    }

    /// The current snapshot without touching the registry.
    pub async fn snapshot(&self) -> Arc<DiscoverySnapshot> {
        self.snapshot.read().await.clone()
    }

    /// Pull `list_agents` and swap in a fresh snapshot. On registry
    /// unavailability the previous snapshot is retained (never cleared) and
    /// the failure is soft: logged, not propagated.
    pub async fn refresh(&self) -> Arc<DiscoverySnapshot> {
        match self.fetch_listings().await {
            Ok(listings) => {
                let fresh = Arc::new(DiscoverySnapshot::from_listings(listings));
                if fresh.is_empty() {
                    info!("Discovery refresh found no registered agents");
                } else {
                    info!(
                        "Discovery refresh found {} tool(s) from {} agent(s)",
                        fresh.tools.len(),
                        fresh.agents.len()
                    );
                }
                let mut slot = self.snapshot.write().await;
                *slot = fresh.clone();
                fresh
            }
            Err(e) => {
                warn!("Failed to contact the registry; keeping the last known snapshot: {e}");
                self.snapshot().await
            }
        }
    }

    /// Bootstrap gate: retry with a fixed delay until at least one tool is
    /// discovered. Cancellable only by process shutdown.
    pub async fn ensure_ready(&self) {
        loop {
            let snapshot = self.refresh().await;
            if !snapshot.is_empty() {
                info!("Initial discovery succeeded");
                return;
            }
            info!(
                "No agents discovered yet; retrying in {}s",
                self.retry_delay.as_secs()
            );
            tokio::time::sleep(self.retry_delay).await;
        }
    }

    async fn fetch_listings(&self) -> Result<HashMap<String, AgentListing>, reqwest::Error> {
        self.client
            .get(&self.list_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn listings_body() -> serde_json::Value {
        serde_json::json!({
            "bio-agent": {
                "base_url": "http://bio:8010",
                "tools": [
                    {"name": "bio-lookup", "description": "Marine biology lookups"}
                ]
            },
            "guide-agent": {
                "base_url": "http://guide:8011/",
                "tools": [
                    {"name": "Guia de IA", "description": "Responsible AI guidance"}
                ]
            }
        })
    }

    #[tokio::test]
    async fn refresh_flattens_tools_with_owner_and_execute_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/list_agents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listings_body()))
            .mount(&server)
            .await;

        let cache = DiscoveryCache::new(&server.uri(), Duration::from_secs(5));
        let snapshot = cache.refresh().await;

        assert_eq!(snapshot.tools.len(), 2);
        let bio = snapshot
            .tools
            .iter()
            .find(|t| t.name == "bio-lookup")
            .unwrap();
        assert_eq!(bio.owner_agent_id, "bio-agent");
        assert_eq!(bio.execute_url, "http://bio:8010/execute");

        let guide = snapshot
            .tools
            .iter()
            .find(|t| t.name == "Guia de IA")
            .unwrap();
        assert_eq!(guide.execute_url, "http://guide:8011/execute");
    }

    #[tokio::test]
    async fn refresh_failure_retains_the_previous_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/list_agents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listings_body()))
            .expect(1)
            .mount(&server)
            .await;

        let cache = DiscoveryCache::new(&server.uri(), Duration::from_secs(5));
        let first = cache.refresh().await;
        assert_eq!(first.tools.len(), 2);

        // Registry goes away; the cached snapshot must survive.
        drop(server);
        let second = cache.refresh().await;
        assert_eq!(second.tools.len(), 2);
    }

    #[tokio::test]
    async fn snapshot_starts_empty() {
        let cache = DiscoveryCache::new("http://localhost:1", Duration::from_secs(5));
        assert!(cache.snapshot().await.is_empty());
    }
}
