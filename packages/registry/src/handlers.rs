// ABOUTME: HTTP request handlers for the Aviary registry service
// ABOUTME: Handles agent register/deregister/listing plus a health probe exposing store mode

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use aviary_core::{ErrorBody, RegisterRequest};

use crate::store::AgentStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AgentStore>,
}

/// Creates the registry API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/register", post(register_agent))
        .route("/deregister", post(deregister_agent))
        .route("/list_agents", get(list_agents))
        .route("/health", get(health_check))
        .with_state(state)
}

/// Register or renew (heartbeat) an agent
pub async fn register_agent(
    State(state): State<AppState>,
    Json(mut request): Json<RegisterRequest>,
) -> impl IntoResponse {
    request.agent_id = request.agent_id.trim().to_string();
    request.base_url = request.base_url.trim().to_string();
    request.secret_token = request.secret_token.trim().to_string();

    if request.agent_id.is_empty() || request.base_url.is_empty() || request.secret_token.is_empty()
    {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody::new(
                "Registration data incomplete or invalid (agent_id, base_url, tools:list, secret_token).",
            )),
        )
            .into_response();
    }

    if let Err(e) = state.store.register(&request).await {
        error!(agent_id = %request.agent_id, "Failed to persist registration: {e}");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody::new("Registry store failure.")),
        )
            .into_response();
    }

    let total = state.store.list().await.map(|l| l.len()).unwrap_or(0);
    info!(
        "Agent '{}' registered. {} live agent(s).",
        request.agent_id, total
    );

    (
        StatusCode::OK,
        Json(json!({
            "message": format!("Agent {} registered successfully.", request.agent_id)
        })),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct DeregisterRequest {
    #[serde(default)]
    pub agent_id: String,
}

/// Remove an agent from the registry
pub async fn deregister_agent(
    State(state): State<AppState>,
    Json(request): Json<DeregisterRequest>,
) -> impl IntoResponse {
    let agent_id = request.agent_id.trim();
    if agent_id.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody::new("The 'agent_id' to deregister was not provided.")),
        )
            .into_response();
    }

    match state.store.deregister(agent_id).await {
        Ok(true) => {
            let total = state.store.list().await.map(|l| l.len()).unwrap_or(0);
            info!("Agent '{agent_id}' deregistered. {total} live agent(s).");
            (
                StatusCode::OK,
                Json(json!({
                    "message": format!("Agent {agent_id} deregistered successfully.")
                })),
            )
                .into_response()
        }
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(ErrorBody::new(format!(
                "Agent {agent_id} is not registered."
            ))),
        )
            .into_response(),
        Err(e) => {
            error!(agent_id = %agent_id, "Failed to deregister: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new("Registry store failure.")),
            )
                .into_response()
        }
    }
}

/// List the public projection of all live agents (secrets withheld)
pub async fn list_agents(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.list().await {
        Ok(listings) => (StatusCode::OK, Json(listings)).into_response(),
        Err(e) => {
            error!("Failed to list agents: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new("Registry store failure.")),
            )
                .into_response()
        }
    }
}

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "store": state.store.mode(),
    }))
}
