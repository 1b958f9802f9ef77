// ABOUTME: Shared protocol types for the Aviary agent fleet
// ABOUTME: A2A envelopes, tool schemas and registry payloads used by every service

pub mod message;
pub mod response;
pub mod tools;

pub use message::{A2AMessage, QueryPayload, PAYLOAD_TYPE_TEXT_QUERY};
pub use response::ErrorBody;
pub use tools::{AgentListing, RegisterRequest, ToolSpec};
