// ABOUTME: Bearer token authentication for the A2A execute surface
// ABOUTME: Compares against the agent's static secret; 403 on any mismatch

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::warn;

use aviary_core::ErrorBody;

use crate::handlers::AppState;

/// Reject any `/execute` call that does not carry this agent's static secret
/// as a bearer token. Missing and invalid tokens are both 403: the caller is
/// either the host (which has the secret) or unwanted.
pub async fn bearer_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let expected = format!("Bearer {}", state.secret_token);
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| value == expected)
        .unwrap_or(false);

    if !authorized {
        warn!("Rejected A2A call with a missing or invalid bearer token");
        return (
            StatusCode::FORBIDDEN,
            Json(ErrorBody::new("Unauthorized access.")),
        )
            .into_response();
    }

    next.run(request).await
}
