use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aviary_host::{AppState, DiscoveryCache, Dispatcher, HostConfig, RoutingPolicy};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "aviary_host=info,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = HostConfig::from_env()?;

    let policy = match &config.routing_policy_path {
        Some(path) => {
            info!("Loading routing policy from {path}");
            RoutingPolicy::from_file(path)?
        }
        None => RoutingPolicy::embedded_default(),
    };

    let discovery = Arc::new(DiscoveryCache::new(
        &config.registry_base_url,
        Duration::from_secs(config.discovery_retry_secs),
    ));
    let dispatcher = Arc::new(Dispatcher::new(
        &config.host_agent_id,
        &config.registry_base_url,
        config.secrets.clone(),
    ));

    // Bootstrap gate: do not serve queries until at least one capability has
    // been discovered.
    info!("Starting initial agent discovery");
    discovery.ensure_ready().await;

    let cors = if config.cors_origin == "*" {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(config.cors_origin.parse::<axum::http::HeaderValue>()?)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(Any)
    };

    let app = aviary_host::create_router(AppState {
        discovery,
        dispatcher,
        policy: Arc::new(policy),
    })
    .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(
        "Aviary host '{}' listening on http://{addr}",
        config.host_agent_id
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
