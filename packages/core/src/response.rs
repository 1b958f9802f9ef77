// ABOUTME: Shared JSON error body returned by every Aviary HTTP surface

use serde::{Deserialize, Serialize};

/// Error envelope for all non-2xx responses across the fleet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
