//! Events that can occur in a conversation

use crate::data_url::ImageUpload;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    UserSubmit {
        text: String,
        image: Option<ImageUpload>,
    },

    // Image conversion
    ImageRead {
        data_url: String,
    },
    ImageReadFailed,

    // Model events
    ReplyReady {
        text: String,
    },
    ReplyFailed,
}

impl Event {
    pub fn user_text(text: impl Into<String>) -> Self {
        Event::UserSubmit {
            text: text.into(),
            image: None,
        }
    }

    /// Short label for logs; payloads can be large
    pub fn kind(&self) -> &'static str {
        match self {
            Event::UserSubmit { .. } => "user_submit",
            Event::ImageRead { .. } => "image_read",
            Event::ImageReadFailed => "image_read_failed",
            Event::ReplyReady { .. } => "reply_ready",
            Event::ReplyFailed => "reply_failed",
        }
    }
}
