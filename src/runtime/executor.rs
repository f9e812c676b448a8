//! Session runtime executor

use super::traits::LlmClient;
use super::{QueuedEvent, SseEvent};

use crate::conversation::{Conversation, ConversationSnapshot, Turn};
use crate::data_url::ImageReader;
use crate::state_machine::{transition, ConvState, Effect, Event, TransitionError};
use crate::translator;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};

/// Owns one conversation and drives it through the state machine.
///
/// Runs on a single task; the model call and image conversion are spawned and
/// report back through the event channel, so the conversation itself is never
/// shared.
pub struct SessionRuntime<L, R>
where
    L: LlmClient + ?Sized + 'static,
    R: ImageReader + ?Sized + 'static,
{
    session_id: String,
    state: ConvState,
    conversation: Conversation,
    llm_client: Arc<L>,
    image_reader: Arc<R>,
    event_rx: mpsc::Receiver<QueuedEvent>,
    /// Weak so that the loop ends once every handle and background task is gone
    event_tx: mpsc::WeakSender<QueuedEvent>,
    broadcast_tx: broadcast::Sender<SseEvent>,
    snapshot_tx: watch::Sender<ConversationSnapshot>,
}

impl<L, R> SessionRuntime<L, R>
where
    L: LlmClient + ?Sized + 'static,
    R: ImageReader + ?Sized + 'static,
{
    pub fn new(
        session_id: impl Into<String>,
        llm_client: Arc<L>,
        image_reader: Arc<R>,
        event_rx: mpsc::Receiver<QueuedEvent>,
        event_tx: &mpsc::Sender<QueuedEvent>,
        broadcast_tx: broadcast::Sender<SseEvent>,
        snapshot_tx: watch::Sender<ConversationSnapshot>,
    ) -> Self {
        let conversation = Conversation::new();
        snapshot_tx.send_replace(conversation.snapshot());
        Self {
            session_id: session_id.into(),
            state: ConvState::Idle,
            conversation,
            llm_client,
            image_reader,
            event_rx,
            event_tx: event_tx.downgrade(),
            broadcast_tx,
            snapshot_tx,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(session_id = %self.session_id, "Starting session runtime");

        while let Some(QueuedEvent { event, accepted }) = self.event_rx.recv().await {
            let applied = self.process_event(event);
            if let Some(accepted) = accepted {
                let _ = accepted.send(applied);
            }
        }

        tracing::info!(
            session_id = %self.session_id,
            turns = self.conversation.turns().len(),
            "Session runtime stopped"
        );
    }

    /// Returns whether the event was applied
    fn process_event(&mut self, event: Event) -> bool {
        let kind = event.kind();

        // Pure state transition
        let result = match transition(&self.state, event) {
            Ok(r) => r,
            Err(e @ (TransitionError::Busy | TransitionError::EmptySubmission)) => {
                tracing::debug!(session_id = %self.session_id, reason = %e, "Ignoring submission");
                return false;
            }
            Err(e) => {
                tracing::warn!(session_id = %self.session_id, event = kind, error = %e, "Dropping event");
                return false;
            }
        };

        tracing::debug!(
            session_id = %self.session_id,
            event = kind,
            from = self.state.name(),
            to = result.new_state.name(),
            "State transition"
        );
        self.state = result.new_state;

        for effect in result.effects {
            self.execute_effect(effect);
        }

        self.snapshot_tx.send_replace(self.conversation.snapshot());
        true
    }

    /// Execute an effect
    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::AppendTurn {
                speaker,
                text,
                image,
            } => {
                let turn = Turn::new(speaker, text, image);
                self.conversation.append_turn(turn.clone());
                let _ = self.broadcast_tx.send(SseEvent::Turn { turn });
            }

            Effect::SetBusy(busy) => {
                self.conversation.set_busy(busy);
                let _ = self.broadcast_tx.send(SseEvent::StateChange {
                    awaiting_response: busy,
                });
            }

            Effect::ReadImage { upload } => {
                let Some(event_tx) = self.event_tx.upgrade() else {
                    return;
                };
                let reader = self.image_reader.clone();
                let session_id = self.session_id.clone();

                tokio::spawn(async move {
                    let event = match reader.read_data_url(upload).await {
                        Ok(data_url) => Event::ImageRead { data_url },
                        Err(e) => {
                            tracing::error!(session_id = %session_id, error = %e, "Error reading image");
                            Event::ImageReadFailed
                        }
                    };
                    let _ = event_tx.send(event.into()).await;
                });
            }

            Effect::RequestReply { text, image } => {
                let Some(event_tx) = self.event_tx.upgrade() else {
                    return;
                };
                // The newest user turn is already appended; history stops before it.
                let history = self.conversation.request_history().to_vec();
                let llm_client = self.llm_client.clone();
                let session_id = self.session_id.clone();

                tokio::spawn(async move {
                    tracing::info!(
                        session_id = %session_id,
                        history = history.len(),
                        has_image = image.is_some(),
                        "Requesting model reply (background)"
                    );
                    let event = match translator::request_reply(
                        &*llm_client,
                        &history,
                        &text,
                        image.as_deref(),
                    )
                    .await
                    {
                        Ok(text) => Event::ReplyReady { text },
                        Err(_) => Event::ReplyFailed,
                    };
                    let _ = event_tx.send(event.into()).await;
                });
            }
        }
    }
}
