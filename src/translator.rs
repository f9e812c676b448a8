//! Conversation → model request, model response → reply text

use crate::conversation::{Speaker, Turn};
use crate::data_url::DataUrl;
use crate::llm::{ContentBlock, LlmMessage, LlmRequest, LlmResponse, MessageRole};
use crate::runtime::LlmClient;
use crate::system_prompt::{EMPTY_REPLY, SYSTEM_INSTRUCTION, THINKING_BUDGET};
use thiserror::Error;

/// The one failure the caller sees; the cause is logged where it happens.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("model request failed")]
pub struct TranslateError;

/// Build the request for the current input given the prior turns.
///
/// `history` must not contain the turn being answered; see
/// [`crate::conversation::Conversation::request_history`].
pub fn build_request(history: &[Turn], text: &str, image: Option<&str>) -> LlmRequest {
    let mut messages: Vec<LlmMessage> = history
        .iter()
        .map(|turn| {
            let role = match turn.speaker {
                Speaker::User => MessageRole::User,
                Speaker::Model => MessageRole::Model,
            };
            LlmMessage::new(role, content_blocks(&turn.text, turn.image.as_deref()))
        })
        .collect();

    messages.push(LlmMessage::new(MessageRole::User, content_blocks(text, image)));

    LlmRequest {
        system: Some(SYSTEM_INSTRUCTION.to_string()),
        messages,
        thinking_budget: Some(THINKING_BUDGET),
    }
}

/// Image part first, then text; either may be absent.
fn content_blocks(text: &str, image: Option<&str>) -> Vec<ContentBlock> {
    let mut blocks = Vec::with_capacity(2);
    if let Some(url) = image {
        match DataUrl::parse(url) {
            Ok(parsed) => blocks.push(ContentBlock::image(parsed.mime_type, parsed.payload)),
            Err(e) => tracing::warn!(error = %e, "Dropping malformed image from request"),
        }
    }
    if !text.is_empty() {
        blocks.push(ContentBlock::text(text));
    }
    blocks
}

/// Issue one model call for the current input. No retry; any failure is
/// logged here and collapses into [`TranslateError`].
pub async fn request_reply<C>(
    client: &C,
    history: &[Turn],
    text: &str,
    image: Option<&str>,
) -> Result<String, TranslateError>
where
    C: LlmClient + ?Sized,
{
    let request = build_request(history, text, image);
    match client.complete(&request).await {
        Ok(response) => Ok(reply_text(&response)),
        Err(e) => {
            tracing::error!(
                model = %client.model_id(),
                kind = e.kind.as_str(),
                error = %e,
                "Error communicating with the model"
            );
            Err(TranslateError)
        }
    }
}

/// Text of a successful reply, with a stock line when the model said nothing
pub fn reply_text(response: &LlmResponse) -> String {
    let text = response.text();
    if text.is_empty() {
        EMPTY_REPLY.to_string()
    } else {
        text
    }
}
