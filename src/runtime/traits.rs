//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::llm::{LlmError, LlmRequest, LlmResponse, LlmService};
use async_trait::async_trait;
use std::sync::Arc;

/// Client for making LLM requests
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Complete an LLM request
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use the configured provider as `LlmClient`.
///
/// Without a credential there is no provider; every request then fails and
/// the session answers with the apology turn.
pub struct ServiceLlmClient {
    service: Option<Arc<dyn LlmService>>,
}

impl ServiceLlmClient {
    pub fn new(service: Option<Arc<dyn LlmService>>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl LlmClient for ServiceLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let llm = self
            .service
            .as_ref()
            .ok_or_else(|| LlmError::auth("No API key configured"))?;
        llm.complete(request).await
    }

    fn model_id(&self) -> &str {
        self.service.as_ref().map_or("unconfigured", |s| s.model_id())
    }
}
