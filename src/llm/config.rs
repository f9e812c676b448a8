//! Provider configuration read from the environment

use super::{GeminiService, LlmService, LoggingService};
use std::sync::Arc;

/// Model used when `GEMINI_MODEL` is unset
pub const DEFAULT_MODEL: &str = "gemini-3-pro-preview";

/// Configuration for the Gemini provider
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    /// Gateway base URL; the gateway handles authentication
    pub gateway: Option<String>,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("GEMINI_API_KEY")
                .or_else(|_| std::env::var("API_KEY"))
                .ok()
                .filter(|key| !key.is_empty()),
            model: std::env::var("GEMINI_MODEL").ok().filter(|m| !m.is_empty()),
            gateway: std::env::var("LLM_GATEWAY").ok().filter(|g| !g.is_empty()),
        }
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    /// Build the logging-wrapped service, or `None` when no credential is
    /// available in direct mode.
    pub fn build_service(&self) -> Option<Arc<dyn LlmService>> {
        if self.gateway.is_none() && self.api_key.is_none() {
            return None;
        }

        match GeminiService::new(self.api_key.clone(), self.model(), self.gateway.as_deref()) {
            Ok(service) => Some(Arc::new(LoggingService::new(Arc::new(service)))),
            Err(e) => {
                tracing::error!(error = %e, "Failed to create Gemini service");
                None
            }
        }
    }
}
