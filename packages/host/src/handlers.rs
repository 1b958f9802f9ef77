// ABOUTME: HTTP request handlers for the host agent
// ABOUTME: Refresh-then-route-then-dispatch for /query, plus the health probe

use std::sync::Arc;

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use aviary_core::A2AMessage;

use crate::discovery::DiscoveryCache;
use crate::dispatch::Dispatcher;
use crate::error::HostError;
use crate::routing::{self, RoutingPolicy, FALLBACK_PREFIX};

#[derive(Clone)]
pub struct AppState {
    pub discovery: Arc<DiscoveryCache>,
    pub dispatcher: Arc<Dispatcher>,
    pub policy: Arc<RoutingPolicy>,
}

/// Creates the host API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/query", post(handle_query))
        .route("/health", get(health_check))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub query: String,
    /// Session identifier from the UI, forwarded to the specialist untouched.
    #[serde(default)]
    pub uuid: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_tool: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chosen_temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
}

/// Route an inbound query to the right specialist and pass its answer back.
pub async fn handle_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Response, HostError> {
    let query = request.query.trim().to_string();
    if query.is_empty() {
        return Err(HostError::EmptyQuery);
    }

    // Every query refreshes discovery first, so dead agents are detected at
    // request time at the cost of one registry round trip.
    let snapshot = state.discovery.refresh().await;

    // The privileged capabilities query bypasses routing entirely and is
    // answered even when nothing is registered.
    if routing::is_capabilities_query(&query, &state.policy) {
        return Ok(Json(routing::capabilities_response(&snapshot)).into_response());
    }

    if snapshot.is_empty() {
        return Err(HostError::NoAgents);
    }

    let Some(decision) = routing::route(&query, &snapshot, &state.policy) else {
        // Friendly fallback: introduce the host and list who is available.
        let capabilities = routing::capabilities_response(&snapshot);
        return Ok(Json(json!({
            "answer": format!("{FALLBACK_PREFIX}{}", capabilities.answer),
            "agents": capabilities.agents,
        }))
        .into_response());
    };

    info!(
        "Routing query to tool '{}' owned by '{}'",
        decision.tool_name, decision.owner_agent_id
    );

    let message = A2AMessage::text_query(
        state.dispatcher.host_agent_id(),
        &decision.owner_agent_id,
        &query,
        request.uuid,
    );

    let reply = state
        .dispatcher
        .dispatch(&decision, &snapshot, &message)
        .await?;

    Ok(Json(QueryResponse {
        answer: reply.result.clone().or(reply.answer),
        source_agent_id: Some(decision.owner_agent_id),
        source_tool: Some(decision.tool_name),
        sources: reply.sources,
        chosen_temperature: reply.chosen_temperature,
        similarity: reply.similarity,
    })
    .into_response())
}

pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
