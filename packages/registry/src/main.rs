use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aviary_registry::store::AgentStore;
use aviary_registry::{create_router, AppState, MemoryStore, RegistryConfig, SqliteStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "aviary_registry=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RegistryConfig::from_env()?;
    let ttl = chrono::Duration::seconds(config.ttl_secs as i64);

    // Prefer the shared SQLite store; degrade to the in-process map when it
    // cannot be opened. Degraded mode is logged and exposed via /health.
    let store: Arc<dyn AgentStore> = match SqliteStore::connect(&config.db_path, ttl).await {
        Ok(store) => {
            info!(
                "Registry store: shared SQLite at {}",
                config.db_path.display()
            );
            Arc::new(store)
        }
        Err(e) => {
            warn!("Shared store unavailable ({e}); serving from in-memory fallback with no cross-process visibility");
            Arc::new(MemoryStore::new(ttl))
        }
    };

    let app = create_router(AppState { store });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(
        "Aviary registry listening on http://{addr} (TTL {}s)",
        config.ttl_secs
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
