//! Runtime for chat sessions
//!
//! One session per open page. Each session runs its own executor task that
//! owns the conversation; nothing outlives the process.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::SessionRuntime;
pub use traits::*;

use crate::conversation::{ConversationSnapshot, Turn};
use crate::data_url::{ImageReader, ImageUpload};
use crate::state_machine::Event;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch, RwLock};

/// Manager for all live sessions
pub struct RuntimeManager {
    llm_client: Arc<dyn LlmClient>,
    image_reader: Arc<dyn ImageReader>,
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

/// Handle to interact with a running session
#[derive(Clone)]
pub struct SessionHandle {
    pub event_tx: mpsc::Sender<QueuedEvent>,
    pub broadcast_tx: broadcast::Sender<SseEvent>,
    pub snapshot_rx: watch::Receiver<ConversationSnapshot>,
}

/// An event on its way into a session. `accepted`, when present, learns
/// whether the state machine took the event or dropped it.
#[derive(Debug)]
pub struct QueuedEvent {
    pub event: Event,
    pub accepted: Option<oneshot::Sender<bool>>,
}

impl From<Event> for QueuedEvent {
    fn from(event: Event) -> Self {
        Self {
            event,
            accepted: None,
        }
    }
}

/// Events sent to SSE clients
#[derive(Debug, Clone)]
pub enum SseEvent {
    Init { snapshot: ConversationSnapshot },
    Turn { turn: Turn },
    StateChange { awaiting_response: bool },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),
    #[error("Session {0} has stopped")]
    Stopped(String),
}

impl RuntimeManager {
    pub fn new(llm_client: Arc<dyn LlmClient>, image_reader: Arc<dyn ImageReader>) -> Self {
        Self {
            llm_client,
            image_reader,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Start a fresh session (greeting only) and return its id
    pub async fn create_session(&self) -> String {
        let session_id = uuid::Uuid::new_v4().to_string();

        let (event_tx, event_rx) = mpsc::channel(32);
        let (broadcast_tx, _) = broadcast::channel(128);
        let (snapshot_tx, snapshot_rx) = watch::channel(ConversationSnapshot {
            turns: Vec::new(),
            awaiting_response: false,
        });

        let runtime = SessionRuntime::new(
            &session_id,
            self.llm_client.clone(),
            self.image_reader.clone(),
            event_rx,
            &event_tx,
            broadcast_tx.clone(),
            snapshot_tx,
        );

        tokio::spawn(runtime.run());

        self.sessions.write().await.insert(
            session_id.clone(),
            SessionHandle {
                event_tx,
                broadcast_tx,
                snapshot_rx,
            },
        );

        tracing::info!(
            session_id = %session_id,
            model = %self.llm_client.model_id(),
            "Session created"
        );
        session_id
    }

    async fn handle(&self, session_id: &str) -> Result<SessionHandle, SessionError> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }

    /// Hand a user submission to a session.
    ///
    /// Resolves to `false` when the session dropped it (blank, or a reply is
    /// still pending), so the caller can re-enable its input.
    pub async fn submit(
        &self,
        session_id: &str,
        text: String,
        image: Option<ImageUpload>,
    ) -> Result<bool, SessionError> {
        let handle = self.handle(session_id).await?;
        let (accepted_tx, accepted_rx) = oneshot::channel();
        handle
            .event_tx
            .send(QueuedEvent {
                event: Event::UserSubmit { text, image },
                accepted: Some(accepted_tx),
            })
            .await
            .map_err(|_| SessionError::Stopped(session_id.to_string()))?;
        accepted_rx
            .await
            .map_err(|_| SessionError::Stopped(session_id.to_string()))
    }

    /// Current turns and busy flag
    pub async fn snapshot(&self, session_id: &str) -> Result<ConversationSnapshot, SessionError> {
        let handle = self.handle(session_id).await?;
        let snapshot = handle.snapshot_rx.borrow().clone();
        Ok(snapshot)
    }

    /// Subscribe to session updates.
    ///
    /// The receiver is created before the snapshot is taken, so an update can
    /// show up in both; turns carry ids for the client to de-duplicate.
    pub async fn subscribe(
        &self,
        session_id: &str,
    ) -> Result<(ConversationSnapshot, broadcast::Receiver<SseEvent>), SessionError> {
        let handle = self.handle(session_id).await?;
        let rx = handle.broadcast_tx.subscribe();
        let snapshot = handle.snapshot_rx.borrow().clone();
        Ok((snapshot, rx))
    }

    /// Forget a session. Its executor stops once any in-flight call settles.
    pub async fn close_session(&self, session_id: &str) -> Result<(), SessionError> {
        self.sessions
            .write()
            .await
            .remove(session_id)
            .map(|_| tracing::info!(session_id = %session_id, "Session closed"))
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }

    /// Called when an update stream goes away. A session nobody is watching
    /// can never be shown again (a reload starts a new one), so it is dropped.
    pub async fn release_subscriber(&self, session_id: &str) {
        let mut sessions = self.sessions.write().await;
        let unwatched = sessions
            .get(session_id)
            .is_some_and(|handle| handle.broadcast_tx.receiver_count() == 0);
        if unwatched {
            sessions.remove(session_id);
            tracing::info!(session_id = %session_id, "Session dropped after last subscriber left");
        }
    }

    #[cfg(test)]
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub fn model_id(&self) -> &str {
        self.llm_client.model_id()
    }
}
