// ABOUTME: Host agent for the Aviary fleet
// ABOUTME: Discovers specialists, routes queries heuristically and dispatches with a health gate

pub mod config;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod routing;

pub use config::HostConfig;
pub use discovery::{DiscoveryCache, DiscoverySnapshot, DiscoveredTool};
pub use dispatch::{DispatchError, Dispatcher, SpecialistReply};
pub use error::HostError;
pub use handlers::{create_router, AppState};
pub use routing::{
    capabilities_response, is_capabilities_query, route, RoutingDecision, RoutingPolicy,
};
