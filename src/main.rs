//! Socratic Tutor - a math tutor that answers with questions
//!
//! Serves a single chat page; each open page gets an in-memory session whose
//! turns are sent to Gemini with a Socratic system instruction.

mod api;
mod conversation;
mod data_url;
mod llm;
mod markdown;
mod runtime;
mod state_machine;
mod system_prompt;
mod translator;

use api::{create_router, AppState};
use data_url::Base64ImageReader;
use llm::LlmConfig;
use runtime::ServiceLlmClient;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "socratic_tutor=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let port: u16 = std::env::var("TUTOR_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);

    let llm_config = LlmConfig::from_env();
    let service = llm_config.build_service();
    match &service {
        Some(service) => tracing::info!(model = %service.model_id(), "Gemini client initialized"),
        None => tracing::warn!(
            "No Gemini API key configured. Set GEMINI_API_KEY or LLM_GATEWAY; replies will fail."
        ),
    }

    // Create application state
    let state = AppState::new(
        Arc::new(ServiceLlmClient::new(service)),
        Arc::new(Base64ImageReader),
    );

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Socratic tutor listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
