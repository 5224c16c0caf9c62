//! API request and response types

use crate::runtime::StateSnapshot;
use crate::state_machine::{ChatFeatures, JulieStyle, Message};
use serde::{Deserialize, Serialize};

/// Request to send a typed turn
#[derive(Debug, Deserialize)]
pub struct TurnRequest {
    pub text: String,
}

/// Top-level mode selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopLevelMode {
    Auto,
    Interactive,
}

#[derive(Debug, Deserialize)]
pub struct ModeRequest {
    pub mode: TopLevelMode,
}

/// Who handles the interactive conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handler {
    Direct,
    Julie,
}

#[derive(Debug, Deserialize)]
pub struct HandlerRequest {
    pub handler: Handler,
}

#[derive(Debug, Deserialize)]
pub struct JulieStyleRequest {
    pub style: JulieStyle,
}

/// Response for queued intents
#[derive(Debug, Serialize)]
pub struct QueuedResponse {
    pub queued: bool,
}

/// Snapshot plus full history
#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub state: StateSnapshot,
    pub messages: Vec<Message>,
    pub features: ChatFeatures,
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
