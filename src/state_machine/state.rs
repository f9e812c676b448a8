//! Conversation state types

use serde::{Deserialize, Serialize};

/// Where the session is in the send/reply cycle.
///
/// `ReadingImage` and `AwaitingResponse` are both the busy state as far as
/// the UI is concerned; the former is the image-conversion phase before the
/// user turn has been committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConvState {
    /// Ready for user input, no pending operations
    #[default]
    Idle,

    /// Attached image is being converted; the user turn is not appended yet
    ReadingImage {
        /// Text submitted alongside the image
        text: String,
    },

    /// User turn appended, model request in flight
    AwaitingResponse,
}

impl ConvState {
    /// True whenever send affordances must be disabled
    pub fn is_busy(&self) -> bool {
        !matches!(self, ConvState::Idle)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ConvState::Idle => "idle",
            ConvState::ReadingImage { .. } => "reading_image",
            ConvState::AwaitingResponse => "awaiting_response",
        }
    }
}
