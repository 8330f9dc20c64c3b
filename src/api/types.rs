//! API request and response types

use serde::{Deserialize, Serialize};

/// Button press on a session message
#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    pub actor_id: String,
    pub action: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
