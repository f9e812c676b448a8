//! Pure state transition function
//!
//! Idle --submit--> [ReadingImage -->] AwaitingResponse --reply/failure--> Idle

use super::{ConvState, Effect, Event};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConvState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConvState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Reasons an event is dropped without touching the conversation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("A reply is still pending, cannot accept message")]
    Busy,
    #[error("Nothing to send: message is blank and has no image")]
    EmptySubmission,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs; all I/O is
/// described by the returned effects.
pub fn transition(state: &ConvState, event: Event) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // User submission
        // ============================================================
        (ConvState::Idle, Event::UserSubmit { text, image }) => {
            if text.trim().is_empty() && image.is_none() {
                return Err(TransitionError::EmptySubmission);
            }

            match image {
                // The turn can only be built once the image is a data-URL.
                Some(upload) => Ok(TransitionResult::new(ConvState::ReadingImage { text })
                    .with_effect(Effect::SetBusy(true))
                    .with_effect(Effect::ReadImage { upload })),
                None => Ok(TransitionResult::new(ConvState::AwaitingResponse)
                    .with_effect(Effect::append_user_turn(text.clone(), None))
                    .with_effect(Effect::SetBusy(true))
                    .with_effect(Effect::RequestReply { text, image: None })),
            }
        }

        // No queueing: the UI has sending disabled, anything that slips
        // through is dropped.
        (ConvState::ReadingImage { .. } | ConvState::AwaitingResponse, Event::UserSubmit { .. }) => {
            Err(TransitionError::Busy)
        }

        // ============================================================
        // Image conversion
        // ============================================================
        (ConvState::ReadingImage { text }, Event::ImageRead { data_url }) => {
            Ok(TransitionResult::new(ConvState::AwaitingResponse)
                .with_effect(Effect::append_user_turn(text.clone(), Some(data_url.clone())))
                .with_effect(Effect::RequestReply {
                    text: text.clone(),
                    image: Some(data_url),
                }))
        }

        // Abort the send entirely; nothing was appended.
        (ConvState::ReadingImage { .. }, Event::ImageReadFailed) => {
            Ok(TransitionResult::new(ConvState::Idle).with_effect(Effect::SetBusy(false)))
        }

        // ============================================================
        // Model reply
        // ============================================================
        (ConvState::AwaitingResponse, Event::ReplyReady { text }) => {
            Ok(TransitionResult::new(ConvState::Idle)
                .with_effect(Effect::append_model_turn(text))
                .with_effect(Effect::SetBusy(false)))
        }

        (ConvState::AwaitingResponse, Event::ReplyFailed) => {
            Ok(TransitionResult::new(ConvState::Idle)
                .with_effect(Effect::append_apology())
                .with_effect(Effect::SetBusy(false)))
        }

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "{} in state {}",
            event.kind(),
            state.name()
        ))),
    }
}
