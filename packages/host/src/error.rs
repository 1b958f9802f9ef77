use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use aviary_core::ErrorBody;

use crate::dispatch::DispatchError;

/// Errors surfaced by the host's `/query` endpoint.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("The 'query' field must not be empty.")]
    EmptyQuery,

    #[error("No specialist agents are available right now.")]
    NoAgents,

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl IntoResponse for HostError {
    fn into_response(self) -> Response {
        let status = match &self {
            HostError::EmptyQuery => StatusCode::BAD_REQUEST,
            HostError::NoAgents => StatusCode::SERVICE_UNAVAILABLE,
            HostError::Dispatch(e) => match e {
                DispatchError::MissingCredential(_) | DispatchError::UnknownAgent(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                DispatchError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                DispatchError::Upstream { .. } | DispatchError::Transport(_) => {
                    StatusCode::BAD_GATEWAY
                }
            },
        };

        if status.is_server_error() {
            error!("{self}");
        }

        (status, Json(ErrorBody::new(self.to_string()))).into_response()
    }
}
