use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use aviary_core::ErrorBody;

use crate::retriever::RetrieverError;

#[derive(Debug, Error)]
pub enum SpecialistError {
    #[error("The 'query' was not received.")]
    EmptyQuery,

    #[error("Internal specialist agent error: {0}")]
    Retrieval(#[from] RetrieverError),
}

impl IntoResponse for SpecialistError {
    fn into_response(self) -> Response {
        let status = match &self {
            SpecialistError::EmptyQuery => StatusCode::BAD_REQUEST,
            SpecialistError::Retrieval(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!("{self}");
        }

        (status, Json(ErrorBody::new(self.to_string()))).into_response()
    }
}
