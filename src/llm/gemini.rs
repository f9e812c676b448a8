//! Google Gemini provider implementation

use super::types::{ContentBlock, ImageSource, LlmRequest, LlmResponse, MessageRole, Usage};
use super::{LlmError, LlmService};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DIRECT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini service implementation
pub struct GeminiService {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
    model_id: String,
}

impl GeminiService {
    /// Build a service for `model`. With a gateway the credential is implicit
    /// and `api_key` may be `None`.
    pub fn new(
        api_key: Option<String>,
        model: &str,
        gateway: Option<&str>,
    ) -> Result<Self, LlmError> {
        let endpoint = match gateway {
            Some(gw) => format!(
                "{}/gemini/v1beta/models/{model}:generateContent",
                gw.trim_end_matches('/')
            ),
            None => format!("{DIRECT_BASE_URL}/v1beta/models/{model}:generateContent"),
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            endpoint,
            model_id: model.to_string(),
        })
    }

    #[cfg(test)]
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn translate_request(request: &LlmRequest) -> GeminiRequest {
        let system_instruction = request.system.as_ref().map(|text| GeminiContent {
            role: None,
            parts: vec![GeminiPart::text(text.clone())],
        });

        // Entries are kept even when they carry no parts; the turn order the
        // model sees must match the conversation.
        let contents = request
            .messages
            .iter()
            .map(|msg| {
                let role = match msg.role {
                    MessageRole::User => "user",
                    MessageRole::Model => "model",
                };
                let parts = msg
                    .content
                    .iter()
                    .map(|block| match block {
                        ContentBlock::Text { text } => GeminiPart::text(text.clone()),
                        ContentBlock::Image {
                            source: ImageSource::Base64 { media_type, data },
                        } => GeminiPart::inline_data(media_type.clone(), data.clone()),
                    })
                    .collect();
                GeminiContent {
                    role: Some(role.to_string()),
                    parts,
                }
            })
            .collect();

        let generation_config = request.thinking_budget.map(|budget| GeminiGenerationConfig {
            thinking_config: GeminiThinkingConfig {
                thinking_budget: budget,
            },
        });

        GeminiRequest {
            contents,
            system_instruction,
            generation_config,
        }
    }

    /// Request body as sent on the wire
    #[cfg(test)]
    pub(super) fn wire_request(request: &LlmRequest) -> serde_json::Value {
        serde_json::to_value(Self::translate_request(request)).unwrap_or_default()
    }

    fn normalize_response(resp: GeminiResponse) -> LlmResponse {
        // No candidate (e.g. a blocked prompt) is an empty answer, not a failure.
        let content = resp
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter(|part| !part.thought.unwrap_or(false))
                    .filter_map(|part| part.text)
                    .filter(|text| !text.is_empty())
                    .map(|text| ContentBlock::Text { text })
                    .collect()
            })
            .unwrap_or_default();

        LlmResponse {
            content,
            usage: Usage {
                input_tokens: u64::from(resp.usage_metadata.prompt_token_count),
                output_tokens: u64::from(resp.usage_metadata.candidates_token_count),
                thinking_tokens: u64::from(resp.usage_metadata.thoughts_token_count),
            },
        }
    }

    fn error_from_body(status: u16, body: &str) -> LlmError {
        match serde_json::from_str::<GeminiErrorResponse>(body) {
            Ok(error_resp) => LlmError::from_status(status, &error_resp.error.message),
            Err(_) => LlmError::from_status(status, body),
        }
    }
}

#[async_trait]
impl LlmService for GeminiService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let gemini_request = Self::translate_request(request);

        let mut builder = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&gemini_request);
        if let Some(key) = &self.api_key {
            builder = builder.header("x-goog-api-key", key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::network(format!("Request timeout: {e}"))
            } else if e.is_connect() {
                LlmError::network(format!("Connection failed: {e}"))
            } else {
                LlmError::unknown(format!("Request failed: {e}"))
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(Self::error_from_body(status.as_u16(), &body));
        }

        let gemini_response: GeminiResponse = serde_json::from_str(&body)
            .map_err(|e| LlmError::unknown(format!("Failed to parse response: {e}")))?;

        Ok(Self::normalize_response(gemini_response))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<GeminiInlineData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
}

impl GeminiPart {
    fn text(text: String) -> Self {
        Self {
            text: Some(text),
            ..Self::default()
        }
    }

    fn inline_data(mime_type: String, data: String) -> Self {
        Self {
            inline_data: Some(GeminiInlineData { mime_type, data }),
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    thinking_config: GeminiThinkingConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiThinkingConfig {
    thinking_budget: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: GeminiUsageMetadata,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    thoughts_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}
