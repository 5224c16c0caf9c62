//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use super::{start_conversation, ConversationHandle, ViewEvent};
use crate::chat_api::{ChatApiError, ChatRequest, TranscriptReply, TurnReply};
use crate::state_machine::{ChatContext, ConversationState, Event};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

// ============================================================================
// Mock Chat Backend
// ============================================================================

/// Mock backend that returns queued replies
#[derive(Default)]
pub struct MockChatBackend {
    turns: Mutex<VecDeque<Result<TurnReply, ChatApiError>>>,
    transcripts: Mutex<VecDeque<Result<TranscriptReply, ChatApiError>>>,
    clear_error: Mutex<Option<ChatApiError>>,
    probe_error: Mutex<Option<ChatApiError>>,
    /// Applied to turn and transcript calls
    delay: Duration,
    /// Record of all `/chat` requests made
    pub requests: Mutex<Vec<ChatRequest>>,
    pub cleared: Mutex<Vec<String>>,
    pub probes: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl MockChatBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn queue_turn(&self, reply: TurnReply) {
        self.turns.lock().unwrap().push_back(Ok(reply));
    }

    pub fn queue_turn_error(&self, error: ChatApiError) {
        self.turns.lock().unwrap().push_back(Err(error));
    }

    pub fn queue_transcript(&self, reply: TranscriptReply) {
        self.transcripts.lock().unwrap().push_back(Ok(reply));
    }

    pub fn fail_clear(&self, error: ChatApiError) {
        *self.clear_error.lock().unwrap() = Some(error);
    }

    pub fn fail_probe(&self, error: ChatApiError) {
        *self.probe_error.lock().unwrap() = Some(error);
    }

    pub fn recorded_requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn cleared_sessions(&self) -> Vec<String> {
        self.cleared.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for MockChatBackend {
    async fn send_turn(&self, request: &ChatRequest) -> Result<TurnReply, ChatApiError> {
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.turns
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ChatApiError::network("No more mock turns")))
    }

    async fn generate_transcript(
        &self,
        request: &ChatRequest,
    ) -> Result<TranscriptReply, ChatApiError> {
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.transcripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ChatApiError::network("No more mock transcripts")))
    }

    async fn clear_session(&self, persona: &str) -> Result<(), ChatApiError> {
        self.cleared.lock().unwrap().push(persona.to_string());
        match self.clear_error.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn probe_persona(&self, persona: &str) -> Result<(), ChatApiError> {
        self.probes.lock().unwrap().push(persona.to_string());
        match self.probe_error.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Test Runtime
// ============================================================================

/// Helper for building test runtimes with minimal boilerplate
pub struct TestRuntime {
    pub handle: ConversationHandle,
    pub view_rx: broadcast::Receiver<ViewEvent>,
    pub backend: Arc<MockChatBackend>,
}

impl TestRuntime {
    pub fn new() -> TestRuntimeBuilder {
        TestRuntimeBuilder::new()
    }
}

pub struct TestRuntimeBuilder {
    persona: String,
    context: ChatContext,
    backend: Option<MockChatBackend>,
}

#[allow(dead_code)]
impl TestRuntimeBuilder {
    pub fn new() -> Self {
        Self {
            persona: "Bob".to_string(),
            context: ChatContext::default(),
            backend: None,
        }
    }

    pub fn persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }

    pub fn context(mut self, context: ChatContext) -> Self {
        self.context = context;
        self
    }

    pub fn backend(mut self, backend: MockChatBackend) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn build(self) -> TestRuntime {
        let backend = Arc::new(self.backend.unwrap_or_default());
        let handle = start_conversation(self.persona, self.context, backend.clone());
        let view_rx = handle.subscribe();
        TestRuntime {
            handle,
            view_rx,
            backend,
        }
    }
}

impl Default for TestRuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRuntime {
    pub async fn send(&self, event: Event) {
        self.handle.send(event).await.expect("Failed to send event");
    }

    pub async fn submit(&self, text: &str) {
        self.send(Event::SubmitTurn {
            text: text.to_string(),
        })
        .await;
    }

    /// Wait until the committed state satisfies `predicate`
    pub async fn wait_until(
        &self,
        predicate: impl FnMut(&ConversationState) -> bool,
        timeout: Duration,
    ) -> bool {
        let mut rx = self.handle.watch_state();
        let reached = matches!(
            tokio::time::timeout(timeout, rx.wait_for(predicate)).await,
            Ok(Ok(_))
        );
        reached
    }

    /// Wait for the next rejection on the view stream
    pub async fn next_rejection(&mut self, timeout: Duration) -> Option<String> {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            match tokio::time::timeout(Duration::from_millis(50), self.view_rx.recv()).await {
                Ok(Ok(ViewEvent::Rejected { message })) => return Some(message),
                _ => continue,
            }
        }
        None
    }

    /// `(sender, text)` pairs in display order
    pub fn transcript(&self) -> Vec<(String, String)> {
        self.handle
            .state()
            .messages
            .iter()
            .map(|m| (m.sender.to_string(), m.text.clone()))
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat_api::RetrievedInfo;
    use crate::decision::DecisionSentiment;
    use crate::state_machine::{InteractionMode, RequestKind};
    use serde_json::json;

    const WAIT: Duration = Duration::from_secs(60);

    fn pair(sender: &str, text: &str) -> (String, String) {
        (sender.to_string(), text.to_string())
    }

    #[tokio::test]
    async fn test_mock_backend_replays_queue() {
        let mock = MockChatBackend::new();
        mock.queue_turn(TurnReply {
            response: Some("Hello".into()),
            ..TurnReply::default()
        });

        let request = ChatRequest::interactive("Bob", "hi", "Operator");
        let reply = mock.send_turn(&request).await.unwrap();
        assert_eq!(reply.response.as_deref(), Some("Hello"));

        // Second call should fail (no more replies)
        assert!(mock.send_turn(&request).await.is_err());
        assert_eq!(mock.recorded_requests().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_typed_turn_round_trip() {
        let backend = MockChatBackend::new();
        backend.queue_turn(TurnReply {
            julie_response: Some("Bob, this is Julie from the county.".into()),
            response: Some("What's going on?".into()),
            julie_retrieved_info: Some(RetrievedInfo {
                full_prompt: Some("prompt".into()),
                ..RetrievedInfo::default()
            }),
            ..TurnReply::default()
        });
        let rt = TestRuntime::new().backend(backend).build();

        rt.submit("Hello Bob").await;
        assert!(rt.wait_until(|s| !s.is_pending() && s.messages.len() == 3, WAIT).await);

        assert_eq!(
            rt.transcript(),
            vec![
                pair("Operator", "Hello Bob"),
                pair("Julie", "Bob, this is Julie from the county."),
                pair("Bob", "What's going on?"),
            ]
        );
        let state = rt.handle.state();
        assert!(state.messages[1].retrieved_info.is_some());
        assert!(state.input_enabled());

        let requests = rt.backend.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].speaker.as_deref(), Some("Operator"));
        assert_eq!(rt.backend.probes.lock().unwrap().as_slice(), ["Bob"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_julie_loop_runs_until_concluded() {
        let backend = MockChatBackend::new();
        backend.queue_turn(TurnReply {
            julie_response: Some("The levee is failing.".into()),
            response: Some("I'll think about it.".into()),
            ..TurnReply::default()
        });
        backend.queue_turn(TurnReply {
            julie_response: Some("Please, for your family.".into()),
            response: Some("Alright, we'll go.".into()),
            decision_response: Some(json!("Likely to evacuate")),
            conversation_ended: true,
            ..TurnReply::default()
        });
        let rt = TestRuntime::new().backend(backend).build();

        let start = tokio::time::Instant::now();
        rt.send(Event::SelectJulie).await;
        assert!(rt.wait_until(|s| s.ended, WAIT).await);
        assert!(start.elapsed() >= Duration::from_secs(5));

        let state = rt.handle.state();
        assert_eq!(state.mode, InteractionMode::Direct);
        assert_eq!(
            state.decision.map(|d| d.sentiment),
            Some(DecisionSentiment::Positive)
        );
        assert_eq!(
            rt.transcript().last(),
            Some(&pair("System", "This conversation has reached its conclusion."))
        );

        let requests = rt.backend.recorded_requests();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.auto_julie == Some(true)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_discards_in_flight_reply() {
        let backend = MockChatBackend::new().with_delay(Duration::from_secs(10));
        backend.queue_turn(TurnReply {
            response: Some("too late".into()),
            ..TurnReply::default()
        });
        let rt = TestRuntime::new().backend(backend).build();

        rt.submit("Hello").await;
        assert!(rt.wait_until(|s| s.is_pending(), WAIT).await);
        rt.send(Event::Restart).await;
        assert!(
            rt.wait_until(
                |s| s.pending_kind().is_none() && s.messages.len() == 1,
                WAIT
            )
            .await
        );

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(
            rt.transcript(),
            vec![pair(
                "System",
                "Conversation restarted. You can now chat with Bob."
            )]
        );
        assert_eq!(rt.backend.cleared_sessions(), vec!["Bob".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_survives_clear_failure() {
        let backend = MockChatBackend::new();
        backend.fail_clear(ChatApiError::status(500, "boom"));
        let rt = TestRuntime::new().backend(backend).build();

        rt.send(Event::Restart).await;
        assert!(rt.wait_until(|s| s.messages.len() == 1, WAIT).await);
        assert!(rt.handle.state().input_enabled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transcript_is_paced() {
        let backend = MockChatBackend::new();
        backend.queue_transcript(TranscriptReply {
            transcript: Some(
                "Operator: Please evacuate now.\nAlice: I don't think so.\nOperator: It's very serious."
                    .into(),
            ),
            decision: Some(json!("Refuses to evacuate")),
            ..TranscriptReply::default()
        });
        let rt = TestRuntime::new().persona("Alice").backend(backend).build();

        let start = tokio::time::Instant::now();
        rt.send(Event::SelectAutoTranscript).await;
        assert!(
            rt.wait_until(
                |s| s.mode == InteractionMode::AutoTranscript && !s.is_pending() && s.messages.len() == 3,
                WAIT
            )
            .await
        );
        assert!(start.elapsed() >= Duration::from_secs(3));

        assert_eq!(
            rt.transcript(),
            vec![
                pair("Operator", "Please evacuate now."),
                pair("Alice", "I don't think so."),
                pair("Operator", "It's very serious."),
            ]
        );
        assert_eq!(
            rt.handle.state().decision.map(|d| d.sentiment),
            Some(DecisionSentiment::Negative)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_submit_rejected_while_pending() {
        let backend = MockChatBackend::new().with_delay(Duration::from_secs(1));
        backend.queue_turn(TurnReply {
            response: Some("ok".into()),
            ..TurnReply::default()
        });
        let mut rt = TestRuntime::new().backend(backend).build();

        rt.submit("first").await;
        rt.submit("second").await;

        assert_eq!(
            rt.next_rejection(WAIT).await.as_deref(),
            Some("A request is already in progress")
        );
        assert!(rt.wait_until(|s| s.pending_kind().is_none() && s.messages.len() == 2, WAIT).await);
        assert_eq!(rt.backend.recorded_requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_turn_reenables_input() {
        let backend = MockChatBackend::new();
        backend.queue_turn_error(ChatApiError::status(502, "Bad Gateway"));
        let rt = TestRuntime::new().backend(backend).build();

        rt.submit("Hello").await;
        assert!(rt.wait_until(|s| s.messages.len() == 2 && !s.is_pending(), WAIT).await);
        assert_eq!(rt.transcript()[1], pair("System", "Error: HTTP 502: Bad Gateway"));

        let state = rt.handle.state();
        assert!(state.input_enabled());
        assert_ne!(state.pending_kind(), Some(RequestKind::Turn));
    }

    #[tokio::test(start_paused = true)]
    async fn test_julie_toggle_keeps_one_loop() {
        let backend = MockChatBackend::new();
        for n in 1..=4 {
            backend.queue_turn(TurnReply {
                julie_response: Some(format!("Julie line {n}")),
                response: Some(format!("Bob line {n}")),
                ..TurnReply::default()
            });
        }
        let rt = TestRuntime::new().backend(backend).build();
        let start = tokio::time::Instant::now();

        rt.send(Event::SelectJulie).await;
        assert!(rt.wait_until(|s| s.messages.len() == 3 && !s.is_pending(), WAIT).await);

        // Leave and re-enter before the armed turn at 5s fires
        tokio::time::sleep_until(start + Duration::from_secs(3)).await;
        rt.send(Event::SelectDirect).await;
        rt.send(Event::SelectJulie).await;
        assert!(rt.wait_until(|s| s.messages.len() == 6 && !s.is_pending(), WAIT).await);

        tokio::time::sleep_until(start + Duration::from_millis(6500)).await;
        assert_eq!(rt.backend.recorded_requests().len(), 2);

        tokio::time::sleep_until(start + Duration::from_millis(8500)).await;
        assert_eq!(rt.backend.recorded_requests().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_persona_still_chats() {
        let backend = MockChatBackend::new();
        backend.fail_probe(ChatApiError::status(404, "Unknown persona"));
        backend.queue_turn(TurnReply {
            response: Some("Who's asking?".into()),
            ..TurnReply::default()
        });
        let rt = TestRuntime::new().backend(backend).build();

        rt.submit("Hello Bob").await;
        assert!(rt.wait_until(|s| s.messages.len() == 2 && !s.is_pending(), WAIT).await);

        assert_eq!(rt.transcript()[1], pair("Bob", "Who's asking?"));
        assert_eq!(rt.backend.probes.lock().unwrap().as_slice(), ["Bob"]);
        assert!(rt.handle.state().input_enabled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_attach_continues_where_snapshot_ends() {
        let backend = MockChatBackend::new();
        backend.queue_turn(TurnReply {
            response: Some("Go away.".into()),
            ..TurnReply::default()
        });
        backend.queue_turn(TurnReply {
            response: Some("Still here.".into()),
            ..TurnReply::default()
        });
        let rt = TestRuntime::new().backend(backend).build();

        rt.submit("Hello").await;
        assert!(rt.wait_until(|s| s.messages.len() == 2 && !s.is_pending(), WAIT).await);

        let (snapshot, mut view_rx) = rt.handle.attach().await.unwrap();
        assert_eq!(snapshot.messages.len(), 2);

        rt.submit("Please leave").await;
        assert!(rt.wait_until(|s| s.messages.len() == 4 && !s.is_pending(), WAIT).await);

        let mut sequences = Vec::new();
        while let Ok(event) = view_rx.try_recv() {
            if let ViewEvent::Message { message } = event {
                sequences.push(message.sequence);
            }
        }
        assert_eq!(sequences, vec![3, 4]);
    }
}
