//! Server-Sent Events support

use crate::runtime::{RuntimeManager, SseEvent};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Lives as long as one update stream. On drop it lets the runtime discard
/// the session if no other stream is watching it.
pub struct SubscriberGuard {
    runtime: Arc<RuntimeManager>,
    session_id: String,
}

impl SubscriberGuard {
    pub fn new(runtime: Arc<RuntimeManager>, session_id: impl Into<String>) -> Self {
        Self {
            runtime,
            session_id: session_id.into(),
        }
    }
}

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let runtime = self.runtime.clone();
        let session_id = std::mem::take(&mut self.session_id);
        handle.spawn(async move {
            runtime.release_subscriber(&session_id).await;
        });
    }
}

/// Convert broadcast stream to SSE stream
pub fn sse_stream(
    init_event: SseEvent,
    broadcast_rx: tokio::sync::broadcast::Receiver<SseEvent>,
    guard: SubscriberGuard,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Create stream that starts with init event then broadcasts
    let init = futures::stream::once(async move { Ok(sse_event_to_axum(init_event)) });

    // The map closure owns the guard and drops after the inner stream, so the
    // receiver is already gone when the guard counts subscribers.
    let broadcasts = BroadcastStream::new(broadcast_rx)
        .filter_map(|result| match result {
            Ok(event) => Some(Ok(sse_event_to_axum(event))),
            Err(_) => None, // Skip lagged messages
        })
        .map(move |item| {
            let _ = &guard;
            item
        });

    let combined = init.chain(broadcasts);

    Sse::new(combined).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn sse_event_to_axum(event: SseEvent) -> Event {
    let (event_type, data) = sse_payload(event);
    Event::default().event(event_type).data(data.to_string())
}

fn sse_payload(event: SseEvent) -> (&'static str, serde_json::Value) {
    match event {
        SseEvent::Init { snapshot } => (
            "init",
            json!({
                "type": "init",
                "turns": snapshot.turns,
                "awaiting_response": snapshot.awaiting_response
            }),
        ),
        SseEvent::Turn { turn } => (
            "turn",
            json!({
                "type": "turn",
                "turn": turn
            }),
        ),
        SseEvent::StateChange { awaiting_response } => (
            "state_change",
            json!({
                "type": "state_change",
                "awaiting_response": awaiting_response
            }),
        ),
    }
}
