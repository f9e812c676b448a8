//! API request and response types

use crate::conversation::{ConversationSnapshot, Turn};
use serde::Serialize;

/// Response for session creation
#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub model: String,
}

/// Response with the full conversation
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub turns: Vec<Turn>,
    pub awaiting_response: bool,
}

impl From<ConversationSnapshot> for SessionResponse {
    fn from(snapshot: ConversationSnapshot) -> Self {
        Self {
            turns: snapshot.turns,
            awaiting_response: snapshot.awaiting_response,
        }
    }
}

/// Response for chat action
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub queued: bool,
}

/// Response for lifecycle actions
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
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
