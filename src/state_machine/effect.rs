//! Effects produced by state transitions

use crate::conversation::Speaker;
use crate::data_url::ImageUpload;
use crate::system_prompt::FALLBACK_APOLOGY;

/// Effects to be executed after state transition, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Append a new turn to the conversation
    AppendTurn {
        speaker: Speaker,
        text: String,
        image: Option<String>,
    },

    /// Set the in-flight flag the UI gates sending on
    SetBusy(bool),

    /// Convert an uploaded image to a data-URL (spawns as background task)
    ReadImage { upload: ImageUpload },

    /// Ask the model to answer the newest user turn (spawns as background task)
    RequestReply { text: String, image: Option<String> },
}

impl Effect {
    pub fn append_user_turn(text: impl Into<String>, image: Option<String>) -> Self {
        Effect::AppendTurn {
            speaker: Speaker::User,
            text: text.into(),
            image,
        }
    }

    pub fn append_model_turn(text: impl Into<String>) -> Self {
        Effect::AppendTurn {
            speaker: Speaker::Model,
            text: text.into(),
            image: None,
        }
    }

    pub fn append_apology() -> Self {
        Self::append_model_turn(FALLBACK_APOLOGY)
    }
}
