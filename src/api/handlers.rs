//! HTTP request handlers

use super::assets::{get_index_html, serve_static};
use super::sse::{sse_stream, SubscriberGuard};
use super::types::{
    ChatResponse, CreateSessionResponse, ErrorResponse, SessionResponse, SuccessResponse,
};
use super::AppState;
use crate::data_url::ImageUpload;
use crate::runtime::{SessionError, SseEvent};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Photos straight from a phone camera run to several megabytes
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Root serves the chat page
        .route("/", get(serve_spa))
        // Static assets (embedded or filesystem fallback)
        .route("/assets/*path", get(serve_static))
        // Session lifecycle
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id/close", post(close_session))
        // SSE streaming
        .route("/api/sessions/:id/stream", get(stream_session))
        // User input
        .route(
            "/api/sessions/:id/chat",
            post(send_chat).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// SPA Handler
// ============================================================

async fn serve_spa() -> impl IntoResponse {
    match get_index_html() {
        Some(content) => Html(content).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Html("<h1>404 - UI not found</h1>".to_string()),
        )
            .into_response(),
    }
}

// ============================================================
// Session Lifecycle
// ============================================================

async fn create_session(State(state): State<AppState>) -> Json<CreateSessionResponse> {
    let session_id = state.runtime.create_session().await;
    Json(CreateSessionResponse {
        session_id,
        model: state.runtime.model_id().to_string(),
    })
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let snapshot = state.runtime.snapshot(&id).await?;
    Ok(Json(snapshot.into()))
}

async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.runtime.close_session(&id).await?;
    Ok(Json(SuccessResponse { success: true }))
}

// ============================================================
// SSE Streaming
// ============================================================

async fn stream_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (snapshot, broadcast_rx) = state.runtime.subscribe(&id).await?;
    let guard = SubscriberGuard::new(state.runtime.clone(), id);
    Ok(sse_stream(SseEvent::Init { snapshot }, broadcast_rx, guard))
}

// ============================================================
// User Input
// ============================================================

/// Accepts `multipart/form-data` with an optional `text` field and an
/// optional `image` file. `queued` is false when the session dropped the
/// submission (blank, or a reply still pending).
async fn send_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<ChatResponse>, AppError> {
    let mut text = String::new();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("text") => {
                text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
            }
            Some("image") => {
                let content_type = field.content_type().map(str::to_string);
                let file_name = field
                    .file_name()
                    .filter(|name| !name.is_empty())
                    .map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;

                // Browsers send an empty, unnamed part when no file was picked
                if bytes.is_empty() && file_name.is_none() {
                    continue;
                }
                image = Some(ImageUpload {
                    bytes: bytes.to_vec(),
                    content_type,
                    file_name,
                });
            }
            other => {
                tracing::debug!(field = ?other, "Ignoring unknown form field");
            }
        }
    }

    let queued = state.runtime.submit(&id, text, image).await?;
    Ok(Json(ChatResponse { queued }))
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("socratic-tutor ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotFound(_) => AppError::NotFound(e.to_string()),
            SessionError::Stopped(_) => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
