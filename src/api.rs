//! HTTP API for the tutor

mod assets;
mod handlers;
mod sse;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::data_url::ImageReader;
use crate::runtime::{LlmClient, RuntimeManager};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<RuntimeManager>,
}

impl AppState {
    pub fn new(llm_client: Arc<dyn LlmClient>, image_reader: Arc<dyn ImageReader>) -> Self {
        Self {
            runtime: Arc::new(RuntimeManager::new(llm_client, image_reader)),
        }
    }
}
