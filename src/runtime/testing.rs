//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::LlmClient;
use super::{QueuedEvent, SessionRuntime, SseEvent};
use crate::conversation::ConversationSnapshot;
use crate::data_url::{Base64ImageReader, ImageUpload};
use crate::llm::{LlmError, LlmRequest, LlmResponse};
use crate::state_machine::Event;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch, Notify};

// ============================================================================
// Mock LLM Client
// ============================================================================

/// Mock LLM client that returns queued responses
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    model_id: String,
    /// Record of all requests made
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmClient {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_response(&self) -> Result<LlmResponse, LlmError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.next_response()
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Gated Mock LLM Client (for in-flight testing)
// ============================================================================

/// Mock LLM client whose calls stay pending until released
pub struct GatedMockLlmClient {
    inner: MockLlmClient,
    gate: Notify,
    /// Notified when a request starts (for test synchronization)
    pub request_started: Notify,
}

impl GatedMockLlmClient {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            inner: MockLlmClient::new(model_id),
            gate: Notify::new(),
            request_started: Notify::new(),
        }
    }

    pub fn queue_response(&self, response: LlmResponse) {
        self.inner.queue_response(response);
    }

    /// Let one pending (or the next) call complete
    pub fn release(&self) {
        self.gate.notify_one();
    }

    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.inner.recorded_requests()
    }
}

#[async_trait]
impl LlmClient for GatedMockLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.inner.requests.lock().unwrap().push(request.clone());
        self.request_started.notify_one();
        self.gate.notified().await;
        self.inner.next_response()
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}

// ============================================================================
// Test Session
// ============================================================================

/// A running session wired to a mock client and the real image reader
pub struct TestSession<L: LlmClient + 'static> {
    pub event_tx: mpsc::Sender<QueuedEvent>,
    pub broadcast_rx: broadcast::Receiver<SseEvent>,
    pub snapshot_rx: watch::Receiver<ConversationSnapshot>,
    pub llm: Arc<L>,
    _runtime_handle: tokio::task::JoinHandle<()>,
}

impl<L: LlmClient + 'static> TestSession<L> {
    pub fn start(llm: L) -> Self {
        let llm = Arc::new(llm);
        let (event_tx, event_rx) = mpsc::channel(32);
        let (broadcast_tx, broadcast_rx) = broadcast::channel(128);
        let (snapshot_tx, snapshot_rx) = watch::channel(ConversationSnapshot {
            turns: Vec::new(),
            awaiting_response: false,
        });

        let runtime = SessionRuntime::new(
            "test-session",
            llm.clone(),
            Arc::new(Base64ImageReader),
            event_rx,
            &event_tx,
            broadcast_tx,
            snapshot_tx,
        );
        let handle = tokio::spawn(runtime.run());

        Self {
            event_tx,
            broadcast_rx,
            snapshot_rx,
            llm,
            _runtime_handle: handle,
        }
    }

    /// Submit text (and optionally an image) as the user
    pub async fn submit(&self, text: &str, image: Option<ImageUpload>) {
        self.event_tx
            .send(
                Event::UserSubmit {
                    text: text.to_string(),
                    image,
                }
                .into(),
            )
            .await
            .expect("Failed to send submission");
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Wait until the published snapshot satisfies `pred`
    pub async fn wait_for(
        &mut self,
        timeout: Duration,
        pred: impl FnMut(&ConversationSnapshot) -> bool,
    ) -> Option<ConversationSnapshot> {
        match tokio::time::timeout(timeout, self.snapshot_rx.wait_for(pred)).await {
            Ok(Ok(snapshot)) => Some(snapshot.clone()),
            _ => None,
        }
    }

    /// Wait for the broadcast that clears the busy flag
    pub async fn wait_for_busy_cleared(&mut self) -> bool {
        loop {
            match tokio::time::timeout(Duration::from_secs(2), self.broadcast_rx.recv()).await {
                Ok(Ok(SseEvent::StateChange {
                    awaiting_response: false,
                })) => return true,
                Ok(Ok(_)) => {}
                _ => return false,
            }
        }
    }

    /// Wait for the session to go idle with `turns` turns in total
    pub async fn wait_for_idle_with(&mut self, turns: usize) -> Option<ConversationSnapshot> {
        self.wait_for(Duration::from_secs(2), |s| {
            !s.awaiting_response && s.turns.len() == turns
        })
        .await
    }
}

pub fn png_upload() -> ImageUpload {
    ImageUpload {
        bytes: vec![0x89, b'P', b'N', b'G'],
        content_type: Some("image/png".to_string()),
        file_name: Some("problem.png".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Speaker;
    use crate::llm::{ContentBlock, MessageRole};
    use crate::system_prompt::{EMPTY_REPLY, FALLBACK_APOLOGY, GREETING};

    #[tokio::test]
    async fn test_mock_llm_client() {
        let mock = MockLlmClient::new("test-model");
        mock.queue_response(LlmResponse::from_text("Hello"));

        let request = LlmRequest {
            system: None,
            messages: vec![],
            thinking_budget: None,
        };

        let response = mock.complete(&request).await.unwrap();
        assert_eq!(response.text(), "Hello");

        // Second call should fail (no more responses)
        let result = mock.complete(&request).await;
        assert!(result.is_err());
        assert_eq!(mock.recorded_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_fresh_session_has_greeting() {
        let session = TestSession::start(MockLlmClient::new("test-model"));
        let snapshot = session.snapshot();
        assert_eq!(snapshot.turns.len(), 1);
        assert_eq!(snapshot.turns[0].speaker, Speaker::Model);
        assert_eq!(snapshot.turns[0].text, GREETING);
        assert!(!snapshot.awaiting_response);
    }

    /// Scenario: first question answered
    #[tokio::test]
    async fn test_first_question_round_trip() {
        let llm = GatedMockLlmClient::new("test-model");
        llm.queue_response(LlmResponse::from_text("Great, what's 5 + ... "));
        let mut session = TestSession::start(llm);

        session.submit("What is 2+3?", None).await;

        // User turn is committed and the session is busy before the reply.
        let pending = session
            .wait_for(Duration::from_secs(2), |s| s.turns.len() == 2)
            .await
            .expect("user turn appended");
        assert!(pending.awaiting_response);
        assert_eq!(pending.turns[1].speaker, Speaker::User);
        assert_eq!(pending.turns[1].text, "What is 2+3?");

        session.llm.request_started.notified().await;
        let requests = session.llm.recorded_requests();
        assert_eq!(requests.len(), 1);
        // History is empty; only the new input is sent.
        assert_eq!(requests[0].messages.len(), 1);
        assert_eq!(requests[0].messages[0].role, MessageRole::User);
        assert_eq!(
            requests[0].messages[0].content,
            vec![ContentBlock::text("What is 2+3?")]
        );

        session.llm.release();
        let done = session.wait_for_idle_with(3).await.expect("reply appended");
        assert_eq!(done.turns[2].speaker, Speaker::Model);
        assert_eq!(done.turns[2].text, "Great, what's 5 + ... ");
    }

    /// Scenario: image sent while a reply is pending is ignored
    #[tokio::test]
    async fn test_submit_while_awaiting_is_ignored() {
        let llm = GatedMockLlmClient::new("test-model");
        llm.queue_response(LlmResponse::from_text("Let's look at it together."));
        let mut session = TestSession::start(llm);

        session.submit("What is 2+3?", None).await;
        session.llm.request_started.notified().await;

        session.submit("", Some(png_upload())).await;
        session.submit("also this", None).await;

        session.llm.release();
        let done = session.wait_for_idle_with(3).await.expect("reply appended");

        assert_eq!(session.llm.recorded_requests().len(), 1);
        assert!(done.turns.iter().all(|t| t.image.is_none()));
        assert_eq!(done.turns[1].text, "What is 2+3?");
    }

    /// Scenario: model call fails
    #[tokio::test]
    async fn test_failure_appends_apology() {
        let llm = MockLlmClient::new("test-model");
        llm.queue_error(LlmError::server_error("boom"));
        let mut session = TestSession::start(llm);

        session.submit("What is 2+3?", None).await;
        let done = session.wait_for_idle_with(3).await.expect("apology appended");

        assert_eq!(done.turns[1].speaker, Speaker::User);
        assert_eq!(done.turns[1].text, "What is 2+3?");
        assert_eq!(done.turns[2].speaker, Speaker::Model);
        assert_eq!(done.turns[2].text, FALLBACK_APOLOGY);
    }

    #[tokio::test]
    async fn test_empty_reply_is_substituted() {
        let llm = MockLlmClient::new("test-model");
        llm.queue_response(LlmResponse::default());
        let mut session = TestSession::start(llm);

        session.submit("Hmm", None).await;
        let done = session.wait_for_idle_with(3).await.expect("reply appended");
        assert_eq!(done.turns[2].text, EMPTY_REPLY);
    }

    #[tokio::test]
    async fn test_blank_submission_changes_nothing() {
        let llm = MockLlmClient::new("test-model");
        llm.queue_response(LlmResponse::from_text("ok"));
        let mut session = TestSession::start(llm);

        session.submit("   ", None).await;
        session.submit("", None).await;
        // A real message afterwards proves the blank ones were processed and dropped.
        session.submit("Hi", None).await;
        let done = session.wait_for_idle_with(3).await.expect("reply appended");

        assert_eq!(done.turns[1].text, "Hi");
        assert_eq!(session.llm.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_image_turn_reaches_model_as_inline_part() {
        let llm = MockLlmClient::new("test-model");
        llm.queue_response(LlmResponse::from_text("What do you notice first?"));
        let mut session = TestSession::start(llm);

        session.submit("", Some(png_upload())).await;
        let done = session.wait_for_idle_with(3).await.expect("reply appended");

        assert_eq!(done.turns[1].text, "");
        assert_eq!(
            done.turns[1].image.as_deref(),
            Some("data:image/png;base64,iVBORw==")
        );

        let requests = session.llm.recorded_requests();
        assert_eq!(
            requests[0].messages[0].content,
            vec![ContentBlock::image("image/png", "iVBORw==")]
        );
    }

    #[tokio::test]
    async fn test_unreadable_image_aborts_send() {
        let llm = MockLlmClient::new("test-model");
        llm.queue_response(LlmResponse::from_text("ok"));
        let mut session = TestSession::start(llm);

        let broken = ImageUpload {
            bytes: vec![],
            content_type: Some("image/png".to_string()),
            file_name: None,
        };
        session.submit("see attached", Some(broken)).await;
        assert!(session.wait_for_busy_cleared().await);
        assert_eq!(session.snapshot().turns.len(), 1);

        session.submit("Hi", None).await;

        let done = session.wait_for_idle_with(3).await.expect("reply appended");
        assert_eq!(done.turns[1].text, "Hi");
        assert_eq!(session.llm.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_follow_up_carries_history() {
        let llm = MockLlmClient::new("test-model");
        llm.queue_response(LlmResponse::from_text("What is the first step?"));
        llm.queue_response(LlmResponse::from_text("Exactly!"));
        let mut session = TestSession::start(llm);

        session.submit("Solve x + 1 = 3", None).await;
        session.wait_for_idle_with(3).await.expect("first reply");
        session.submit("Subtract 1 from both sides", None).await;
        session.wait_for_idle_with(5).await.expect("second reply");

        let requests = session.llm.recorded_requests();
        let second = &requests[1];
        let roles: Vec<MessageRole> = second.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![MessageRole::User, MessageRole::Model, MessageRole::User]
        );
        assert_eq!(
            second.messages[2].content,
            vec![ContentBlock::text("Subtract 1 from both sides")]
        );
    }

    #[tokio::test]
    async fn test_broadcasts_turns_and_busy_flag() {
        let llm = MockLlmClient::new("test-model");
        llm.queue_response(LlmResponse::from_text("Sure"));
        let mut session = TestSession::start(llm);

        session.submit("Help", None).await;

        let mut seen = Vec::new();
        while seen.len() < 4 {
            match tokio::time::timeout(Duration::from_secs(2), session.broadcast_rx.recv()).await {
                Ok(Ok(event)) => seen.push(event),
                _ => break,
            }
        }

        assert!(matches!(&seen[0], SseEvent::Turn { turn } if turn.speaker == Speaker::User));
        assert!(matches!(seen[1], SseEvent::StateChange { awaiting_response: true }));
        assert!(matches!(&seen[2], SseEvent::Turn { turn } if turn.text == "Sure"));
        assert!(matches!(seen[3], SseEvent::StateChange { awaiting_response: false }));
    }
}
