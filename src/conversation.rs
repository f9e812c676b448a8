//! Conversation store
//!
//! An append-only list of turns plus the "request in flight" flag. The
//! session executor owns exactly one of these; the UI renders from its
//! snapshots.

use crate::markdown;
use crate::system_prompt::GREETING;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Model,
}

/// One message from either side. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub id: String,
    pub speaker: Speaker,
    /// May be empty for an image-only turn
    pub text: String,
    /// `text` rendered from Markdown, ready for the page to insert
    #[serde(default)]
    pub html: String,
    /// `data:<mime>;base64,<payload>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(speaker: Speaker, text: impl Into<String>, image: Option<String>) -> Self {
        let text = text.into();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            speaker,
            html: markdown::to_html(&text),
            text,
            image,
            created_at: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>, image: Option<String>) -> Self {
        Self::new(Speaker::User, text, image)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Speaker::Model, text, None)
    }
}

/// Everything the UI needs to draw the conversation
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSnapshot {
    pub turns: Vec<Turn>,
    pub awaiting_response: bool,
}

#[derive(Debug, Clone)]
pub struct Conversation {
    turns: Vec<Turn>,
    awaiting_response: bool,
    greeting_id: String,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    /// Start a conversation with the tutor's greeting so it is never empty.
    pub fn new() -> Self {
        let greeting = Turn::model(GREETING);
        Self {
            greeting_id: greeting.id.clone(),
            turns: vec![greeting],
            awaiting_response: false,
        }
    }

    pub fn append_turn(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn set_busy(&mut self, busy: bool) {
        self.awaiting_response = busy;
    }

    pub fn is_busy(&self) -> bool {
        self.awaiting_response
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Turns sent to the model as prior context: everything strictly before
    /// the newest USER turn, minus the local greeting. The newest USER turn is
    /// the current input and travels separately.
    pub fn request_history(&self) -> &[Turn] {
        let end = self
            .turns
            .iter()
            .rposition(|turn| turn.speaker == Speaker::User)
            .unwrap_or(self.turns.len());
        let start = usize::from(
            self.turns
                .first()
                .is_some_and(|turn| turn.id == self.greeting_id),
        );
        self.turns.get(start..end).unwrap_or_default()
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            turns: self.turns.clone(),
            awaiting_response: self.awaiting_response,
        }
    }
}
