// ABOUTME: Service registry for the Aviary agent fleet
// ABOUTME: TTL-based agent records over a shared SQLite store with in-memory fallback

pub mod config;
pub mod handlers;
pub mod store;

pub use config::RegistryConfig;
pub use handlers::{create_router, AppState};
pub use store::{AgentStore, MemoryStore, SqliteStore, StoreMode};
