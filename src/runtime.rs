//! Runtime for executing conversations
//!
//! One runtime task owns the conversation state; everything else talks to it
//! through a [`ConversationHandle`].

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::ConversationRuntime;
pub use traits::*;

use crate::decision::DecisionStatus;
use crate::state_machine::{
    ChatContext, ConversationState, Event, InteractionMode, JulieStyle, Message, RequestKind,
    Speaker,
};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

/// Errors talking to the runtime task
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Conversation runtime has stopped")]
    Stopped,
}

/// Reply slot for [`ConversationHandle::attach`]
pub type AttachReply = oneshot::Sender<(ConversationState, broadcast::Receiver<ViewEvent>)>;

/// Events sent to view subscribers (SSE clients)
#[derive(Debug, Clone)]
pub enum ViewEvent {
    Message { message: Message },
    Cleared,
    StateChange { state: StateSnapshot },
    Rejected { message: String },
}

/// Render-ready summary of the conversation state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateSnapshot {
    pub mode: InteractionMode,
    pub julie_style: JulieStyle,
    pub current_speaker: Speaker,
    pub selected_persona: String,
    pub pending: Option<RequestKind>,
    pub ended: bool,
    pub input_enabled: bool,
    pub decision: Option<DecisionStatus>,
    pub message_count: usize,
}

impl From<&ConversationState> for StateSnapshot {
    fn from(state: &ConversationState) -> Self {
        Self {
            mode: state.mode,
            julie_style: state.julie_style,
            current_speaker: state.current_speaker.clone(),
            selected_persona: state.selected_persona.clone(),
            pending: state.pending_kind(),
            ended: state.ended,
            input_enabled: state.input_enabled(),
            decision: state.decision.clone(),
            message_count: state.messages.len(),
        }
    }
}

/// Handle to interact with a running conversation
#[derive(Clone)]
pub struct ConversationHandle {
    event_tx: mpsc::Sender<Event>,
    attach_tx: mpsc::Sender<AttachReply>,
    broadcast_tx: broadcast::Sender<ViewEvent>,
    state_rx: watch::Receiver<ConversationState>,
    context: Arc<ChatContext>,
}

impl ConversationHandle {
    /// Queue an event for the runtime
    pub async fn send(&self, event: Event) -> Result<(), RuntimeError> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| RuntimeError::Stopped)
    }

    #[allow(dead_code)] // Useful for tests
    pub fn subscribe(&self) -> broadcast::Receiver<ViewEvent> {
        self.broadcast_tx.subscribe()
    }

    /// Snapshot the state and subscribe between two events, so the view
    /// events that follow start exactly where the snapshot ends
    pub async fn attach(
        &self,
    ) -> Result<(ConversationState, broadcast::Receiver<ViewEvent>), RuntimeError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.attach_tx
            .send(reply_tx)
            .await
            .map_err(|_| RuntimeError::Stopped)?;
        reply_rx.await.map_err(|_| RuntimeError::Stopped)
    }

    /// Latest committed state
    pub fn state(&self) -> ConversationState {
        self.state_rx.borrow().clone()
    }

    #[allow(dead_code)] // Useful for tests
    pub fn watch_state(&self) -> watch::Receiver<ConversationState> {
        self.state_rx.clone()
    }

    pub fn context(&self) -> &ChatContext {
        &self.context
    }
}

/// Spawn a runtime for `persona` and return its handle
pub fn start_conversation<B: ChatBackend + 'static>(
    persona: impl Into<String>,
    context: ChatContext,
    backend: B,
) -> ConversationHandle {
    let state = ConversationState::new(persona);
    let (event_tx, event_rx) = mpsc::channel(64);
    let (attach_tx, attach_rx) = mpsc::channel(16);
    let (broadcast_tx, _) = broadcast::channel(256);
    let (state_tx, state_rx) = watch::channel(state.clone());

    let handle = ConversationHandle {
        event_tx: event_tx.clone(),
        attach_tx,
        broadcast_tx: broadcast_tx.clone(),
        state_rx,
        context: Arc::new(context.clone()),
    };

    let runtime = ConversationRuntime::new(
        context,
        state,
        backend,
        event_rx,
        event_tx,
        attach_rx,
        broadcast_tx,
        state_tx,
    );
    tokio::spawn(async move {
        runtime.run().await;
    });

    handle
}
