use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aviary_anchor::{AnchorConfig, AnchorEngine, OpenAiChatModel, OpenAiEmbedder};
use aviary_specialist::retriever::Retriever;
use aviary_specialist::{
    create_router, spawn_heartbeat, AppState, RegistryClient, SpecialistConfig, StaticRetriever,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "aviary_specialist=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = SpecialistConfig::from_env()?;

    let model = Arc::new(OpenAiChatModel::new(
        &config.llm.base_url,
        &config.llm.api_key,
        &config.llm.model,
    ));
    let embedder = Arc::new(OpenAiEmbedder::new(
        &config.embeddings.base_url,
        &config.embeddings.api_key,
        &config.embeddings.model,
    ));
    let engine = Arc::new(AnchorEngine::new(
        model,
        embedder,
        AnchorConfig {
            temperatures: config.temperatures.clone(),
            threshold: config.threshold,
            ..AnchorConfig::default()
        },
    ));

    let retriever: Arc<dyn Retriever> = match &config.corpus_path {
        Some(path) => Arc::new(StaticRetriever::from_file(path)?),
        None => {
            warn!("CORPUS_PATH not set; serving with an empty corpus (every answer will refuse)");
            Arc::new(StaticRetriever::empty())
        }
    };

    let registry_client = Arc::new(RegistryClient::new(
        &config.registry_base_url,
        &config.agent_id,
        &config.base_url,
        config.tools.clone(),
        &config.secret_token,
    ));
    registry_client.register().await;
    spawn_heartbeat(
        registry_client.clone(),
        Duration::from_secs(config.heartbeat_secs),
    );

    let app = create_router(AppState {
        agent_id: config.agent_id.clone(),
        secret_token: config.secret_token.clone(),
        engine,
        retriever,
        n_results: config.n_results,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(
        "Aviary specialist '{}' listening on http://{addr}",
        config.agent_id
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(registry_client))
        .await?;

    Ok(())
}

/// Wait for ctrl-c, then deregister before the server drains.
async fn shutdown_signal(registry_client: Arc<RegistryClient>) {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received; deregistering from the registry");
        registry_client.deregister().await;
    }
}
