// ABOUTME: Agent-to-agent message envelope used for query delegation
// ABOUTME: One envelope is constructed per dispatch and never mutated afterwards

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payload type for free-text query delegation.
pub const PAYLOAD_TYPE_TEXT_QUERY: &str = "text_query";

/// The query payload carried inside an [`A2AMessage`].
///
/// `query` defaults to empty so receivers can answer a uniform 400 instead
/// of a deserialization rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryPayload {
    #[serde(default)]
    pub query: String,
    /// Caller-supplied session identifier, forwarded untouched so an external
    /// conversation-history collaborator can correlate turns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Envelope for agent-to-agent query delegation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct A2AMessage {
    pub message_id: String,
    pub timestamp: DateTime<Utc>,
    pub sender_agent_id: String,
    pub receiver_agent_id: String,
    pub payload_type: String,
    pub payload: QueryPayload,
}

impl A2AMessage {
    /// Build a `text_query` envelope with a fresh message id and timestamp.
    pub fn text_query(
        sender_agent_id: &str,
        receiver_agent_id: &str,
        query: &str,
        session_id: Option<String>,
    ) -> Self {
        Self {
            message_id: format!("msg_{}", Uuid::new_v4()),
            timestamp: Utc::now(),
            sender_agent_id: sender_agent_id.to_string(),
            receiver_agent_id: receiver_agent_id.to_string(),
            payload_type: PAYLOAD_TYPE_TEXT_QUERY.to_string(),
            payload: QueryPayload {
                query: query.to_string(),
                session_id,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn text_query_stamps_id_and_type() {
        let msg = A2AMessage::text_query("host-agent", "bio-agent", "marine biology", None);

        assert!(msg.message_id.starts_with("msg_"));
        assert_eq!(msg.payload_type, PAYLOAD_TYPE_TEXT_QUERY);
        assert_eq!(msg.sender_agent_id, "host-agent");
        assert_eq!(msg.receiver_agent_id, "bio-agent");
        assert_eq!(msg.payload.query, "marine biology");
    }

    #[test]
    fn envelope_round_trips_through_json() {
        let msg = A2AMessage::text_query("a", "b", "q", Some("sess-1".to_string()));
        let json = serde_json::to_string(&msg).unwrap();
        let back: A2AMessage = serde_json::from_str(&json).unwrap();

        assert_eq!(back.message_id, msg.message_id);
        assert_eq!(back.payload.session_id.as_deref(), Some("sess-1"));
    }

    #[test]
    fn envelope_without_query_parses_to_an_empty_query() {
        let body = serde_json::json!({
            "message_id": "msg_x",
            "timestamp": "2026-01-01T00:00:00Z",
            "sender_agent_id": "a",
            "receiver_agent_id": "b",
            "payload_type": "text_query",
            "payload": {}
        });

        let message: A2AMessage = serde_json::from_value(body).unwrap();
        assert!(message.payload.query.is_empty());
    }
}
