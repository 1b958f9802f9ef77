// ABOUTME: HTTP request handlers for a specialist agent
// ABOUTME: /execute runs retrieval plus anchored generation; /health stays open

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::State,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use aviary_anchor::{unique_sources, AnchorEngine};
use aviary_core::A2AMessage;

use crate::error::SpecialistError;
use crate::retriever::Retriever;

#[derive(Clone)]
pub struct AppState {
    pub agent_id: String,
    pub secret_token: String,
    pub engine: Arc<AnchorEngine>,
    pub retriever: Arc<dyn Retriever>,
    pub n_results: usize,
}

/// Creates the specialist API router; `/execute` sits behind bearer auth.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/execute", post(execute_task))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            crate::auth::bearer_auth,
        ))
        .route("/health", get(health_check))
        .with_state(state)
}

/// Response envelope for a delegated query. `result` duplicates `answer`
/// for callers that predate the rename.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub answer: String,
    pub result: String,
    pub sources: Vec<String>,
    pub chosen_temperature: Option<f32>,
    pub similarity: f32,
}

/// Handle a delegated A2A query: retrieve context, generate candidates,
/// answer with the best anchored one.
pub async fn execute_task(
    State(state): State<AppState>,
    Json(message): Json<A2AMessage>,
) -> Result<Json<ExecuteResponse>, SpecialistError> {
    let query = message.payload.query.trim().to_string();
    if query.is_empty() {
        return Err(SpecialistError::EmptyQuery);
    }

    info!(
        "Executing query from '{}' (message {})",
        message.sender_agent_id, message.message_id
    );

    let documents = state.retriever.retrieve(&query, state.n_results).await?;
    let answer = state.engine.answer(&query, &documents, base_seed()).await;
    let sources = unique_sources(&documents);

    Ok(Json(ExecuteResponse {
        answer: answer.text.clone(),
        result: answer.text,
        sources,
        chosen_temperature: answer.temperature,
        similarity: answer.score,
    }))
}

pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Per-request seed base; the engine offsets it per temperature so
/// same-temperature retries still differ.
fn base_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() % 100_000)
        .unwrap_or(0)
}
