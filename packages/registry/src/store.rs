// ABOUTME: TTL-based agent record stores backing the registry service
// ABOUTME: SQLite shared store with an in-memory fallback for degraded mode

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use tokio::sync::RwLock;

use aviary_core::{AgentListing, RegisterRequest, ToolSpec};

/// Store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Which backing storage is serving the registry.
///
/// Memory mode has no cross-process visibility and is surfaced through
/// `/health` so operators can see the degradation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreMode {
    Shared,
    Memory,
}

impl std::fmt::Display for StoreMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreMode::Shared => write!(f, "shared"),
            StoreMode::Memory => write!(f, "memory"),
        }
    }
}

/// A live registration. `expires_at` is reset on every register call; records
/// past it are invisible to reads and purged when encountered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    pub agent_id: String,
    pub base_url: String,
    pub tools: Vec<ToolSpec>,
    pub secret_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Swappable backing storage for agent records.
///
/// `register` is idempotent and last-write-wins; listings never expose
/// secrets. Expiry is lazy: reads filter on `expires_at` and purge what they
/// skip, which is observably equivalent to an active sweep.
#[async_trait]
pub trait AgentStore: Send + Sync {
    async fn register(&self, request: &RegisterRequest) -> StoreResult<()>;
    /// Returns whether a live record was removed.
    async fn deregister(&self, agent_id: &str) -> StoreResult<bool>;
    async fn list(&self) -> StoreResult<HashMap<String, AgentListing>>;
    /// Internal lookup for the A2A credential; never serialized into listings.
    async fn secret(&self, agent_id: &str) -> StoreResult<Option<String>>;
    fn mode(&self) -> StoreMode;
}

/// In-process fallback store. Contract-identical to [`SqliteStore`] but the
/// records die with the process and are invisible to other processes.
pub struct MemoryStore {
    ttl: Duration,
    entries: RwLock<HashMap<String, AgentRecord>>,
}

impl MemoryStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl AgentStore for MemoryStore {
    async fn register(&self, request: &RegisterRequest) -> StoreResult<()> {
        let record = AgentRecord {
            agent_id: request.agent_id.clone(),
            base_url: request.base_url.clone(),
            tools: request.tools.clone(),
            secret_token: request.secret_token.clone(),
            expires_at: Utc::now() + self.ttl,
        };
        let mut entries = self.entries.write().await;
        entries.insert(record.agent_id.clone(), record);
        Ok(())
    }

    async fn deregister(&self, agent_id: &str) -> StoreResult<bool> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, record| record.expires_at > now);
        Ok(entries.remove(agent_id).is_some())
    }

    async fn list(&self) -> StoreResult<HashMap<String, AgentListing>> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, record| record.expires_at > now);
        Ok(entries
            .iter()
            .map(|(agent_id, record)| {
                (
                    agent_id.clone(),
                    AgentListing {
                        base_url: record.base_url.clone(),
                        tools: record.tools.clone(),
                    },
                )
            })
            .collect())
    }

    async fn secret(&self, agent_id: &str) -> StoreResult<Option<String>> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, record| record.expires_at > now);
        Ok(entries.get(agent_id).map(|r| r.secret_token.clone()))
    }

    fn mode(&self) -> StoreMode {
        StoreMode::Memory
    }
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS agents (
    agent_id TEXT PRIMARY KEY,
    base_url TEXT NOT NULL,
    tools TEXT NOT NULL,
    secret_token TEXT NOT NULL,
    expires_at INTEGER NOT NULL
)";

/// Preferred durable store: a SQLite database shared by every registry
/// process pointed at the same file.
pub struct SqliteStore {
    ttl: Duration,
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(path: &Path, ttl: Duration) -> StoreResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        sqlx::query(SCHEMA).execute(&pool).await?;
        Ok(Self { ttl, pool })
    }

    async fn purge_expired(&self) -> StoreResult<()> {
        sqlx::query("DELETE FROM agents WHERE expires_at <= ?1")
            .bind(Utc::now().timestamp())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl AgentStore for SqliteStore {
    async fn register(&self, request: &RegisterRequest) -> StoreResult<()> {
        let tools = serde_json::to_string(&request.tools)?;
        let expires_at = (Utc::now() + self.ttl).timestamp();
        sqlx::query(
            "INSERT INTO agents (agent_id, base_url, tools, secret_token, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(agent_id) DO UPDATE SET
                 base_url = excluded.base_url,
                 tools = excluded.tools,
                 secret_token = excluded.secret_token,
                 expires_at = excluded.expires_at",
        )
        .bind(&request.agent_id)
        .bind(&request.base_url)
        .bind(&tools)
        .bind(&request.secret_token)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn deregister(&self, agent_id: &str) -> StoreResult<bool> {
        self.purge_expired().await?;
        let result = sqlx::query("DELETE FROM agents WHERE agent_id = ?1")
            .bind(agent_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> StoreResult<HashMap<String, AgentListing>> {
        self.purge_expired().await?;
        let rows = sqlx::query("SELECT agent_id, base_url, tools FROM agents")
            .fetch_all(&self.pool)
            .await?;

        let mut listings = HashMap::with_capacity(rows.len());
        for row in rows {
            let agent_id: String = row.try_get("agent_id")?;
            let base_url: String = row.try_get("base_url")?;
            let tools: String = row.try_get("tools")?;
            listings.insert(
                agent_id,
                AgentListing {
                    base_url,
                    tools: serde_json::from_str(&tools)?,
                },
            );
        }
        Ok(listings)
    }

    async fn secret(&self, agent_id: &str) -> StoreResult<Option<String>> {
        self.purge_expired().await?;
        let row = sqlx::query("SELECT secret_token FROM agents WHERE agent_id = ?1")
            .bind(agent_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| r.try_get("secret_token"))
            .transpose()
            .map_err(StoreError::from)
    }

    fn mode(&self) -> StoreMode {
        StoreMode::Shared
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(agent_id: &str, base_url: &str, secret: &str) -> RegisterRequest {
        RegisterRequest {
            agent_id: agent_id.to_string(),
            base_url: base_url.to_string(),
            tools: vec![ToolSpec {
                name: "bio-lookup".to_string(),
                description: "Marine biology lookups".to_string(),
                parameters: serde_json::Value::Null,
            }],
            secret_token: secret.to_string(),
        }
    }

    #[tokio::test]
    async fn memory_register_is_last_write_wins() {
        let store = MemoryStore::new(Duration::seconds(60));
        store
            .register(&request("bio-agent", "http://old:1", "s1"))
            .await
            .unwrap();
        store
            .register(&request("bio-agent", "http://new:2", "s2"))
            .await
            .unwrap();

        let listings = store.list().await.unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings["bio-agent"].base_url, "http://new:2");
        assert_eq!(
            store.secret("bio-agent").await.unwrap().as_deref(),
            Some("s2")
        );
    }

    #[tokio::test]
    async fn memory_entries_expire_after_ttl() {
        let store = MemoryStore::new(Duration::seconds(1));
        store
            .register(&request("bio-agent", "http://a:1", "s"))
            .await
            .unwrap();
        assert_eq!(store.list().await.unwrap().len(), 1);

        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        assert!(store.list().await.unwrap().is_empty());
        assert!(store.secret("bio-agent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn memory_reregister_resets_the_expiry_timer() {
        let store = MemoryStore::new(Duration::seconds(2));
        store
            .register(&request("bio-agent", "http://a:1", "s"))
            .await
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(1200)).await;
        store
            .register(&request("bio-agent", "http://a:1", "s"))
            .await
            .unwrap();

        // 2.4s after the first register but only 1.2s after the renewal.
        tokio::time::sleep(std::time::Duration::from_millis(1200)).await;
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn memory_deregister_reports_presence() {
        let store = MemoryStore::new(Duration::seconds(60));
        store
            .register(&request("bio-agent", "http://a:1", "s"))
            .await
            .unwrap();

        assert!(store.deregister("bio-agent").await.unwrap());
        assert!(!store.deregister("bio-agent").await.unwrap());
        assert!(!store.deregister("never-registered").await.unwrap());
    }

    #[tokio::test]
    async fn sqlite_register_is_last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::connect(&dir.path().join("registry.db"), Duration::seconds(60))
            .await
            .unwrap();

        store
            .register(&request("bio-agent", "http://old:1", "s1"))
            .await
            .unwrap();
        store
            .register(&request("bio-agent", "http://new:2", "s2"))
            .await
            .unwrap();

        let listings = store.list().await.unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings["bio-agent"].base_url, "http://new:2");
        assert_eq!(
            store.secret("bio-agent").await.unwrap().as_deref(),
            Some("s2")
        );
    }

    #[tokio::test]
    async fn sqlite_entries_expire_after_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::connect(&dir.path().join("registry.db"), Duration::seconds(1))
            .await
            .unwrap();

        store
            .register(&request("bio-agent", "http://a:1", "s"))
            .await
            .unwrap();
        assert_eq!(store.list().await.unwrap().len(), 1);

        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        assert!(store.list().await.unwrap().is_empty());
        assert!(!store.deregister("bio-agent").await.unwrap());
    }

    #[tokio::test]
    async fn sqlite_round_trips_tool_schemas() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::connect(&dir.path().join("registry.db"), Duration::seconds(60))
            .await
            .unwrap();

        let mut req = request("guide-agent", "http://a:1", "s");
        req.tools[0].parameters = serde_json::json!({"question": "string"});
        store.register(&req).await.unwrap();

        let listings = store.list().await.unwrap();
        let tool = &listings["guide-agent"].tools[0];
        assert_eq!(tool.name, "bio-lookup");
        assert_eq!(tool.parameters["question"], "string");
    }
}
