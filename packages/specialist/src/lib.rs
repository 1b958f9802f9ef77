// ABOUTME: Specialist agent service for the Aviary fleet
// ABOUTME: Authenticated A2A execution with retrieval-anchored answers and registry heartbeat

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod registration;
pub mod retriever;

pub use config::SpecialistConfig;
pub use error::SpecialistError;
pub use handlers::{create_router, AppState, ExecuteResponse};
pub use registration::{spawn_heartbeat, RegistryClient};
pub use retriever::{Retriever, RetrieverError, StaticRetriever};
