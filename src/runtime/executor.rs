//! Conversation runtime executor

use super::traits::ChatBackend;
use super::{AttachReply, StateSnapshot, ViewEvent};
use crate::state_machine::{transition, ChatContext, ConversationState, Effect, Event};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Single-writer actor that owns the conversation state
pub struct ConversationRuntime<B: ChatBackend + 'static> {
    context: ChatContext,
    state: ConversationState,
    backend: Arc<B>,
    event_rx: mpsc::Receiver<Event>,
    event_tx: mpsc::Sender<Event>,
    attach_rx: mpsc::Receiver<AttachReply>,
    broadcast_tx: broadcast::Sender<ViewEvent>,
    state_tx: watch::Sender<ConversationState>,
    /// Cancels in-flight Chat API calls and timers; replaced on every abort
    cancel_token: CancellationToken,
}

impl<B: ChatBackend + 'static> ConversationRuntime<B> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        context: ChatContext,
        state: ConversationState,
        backend: B,
        event_rx: mpsc::Receiver<Event>,
        event_tx: mpsc::Sender<Event>,
        attach_rx: mpsc::Receiver<AttachReply>,
        broadcast_tx: broadcast::Sender<ViewEvent>,
        state_tx: watch::Sender<ConversationState>,
    ) -> Self {
        Self {
            context,
            state,
            backend: Arc::new(backend),
            event_rx,
            event_tx,
            attach_rx,
            broadcast_tx,
            state_tx,
            cancel_token: CancellationToken::new(),
        }
    }

    pub async fn run(mut self) {
        let persona = self.state.selected_persona.clone();
        tracing::info!(persona = %persona, "Starting conversation runtime");
        self.spawn_probe();

        loop {
            tokio::select! {
                Some(event) = self.event_rx.recv() => self.process_event(event),
                Some(reply) = self.attach_rx.recv() => {
                    // No event is mid-flight here, so state and stream line up
                    let _ = reply.send((self.state.clone(), self.broadcast_tx.subscribe()));
                }
                else => break,
            }
        }

        self.cancel_token.cancel();
        tracing::info!(persona = %persona, "Conversation runtime stopped");
    }

    fn process_event(&mut self, event: Event) {
        tracing::debug!(?event, "Processing event");

        let result = match transition(&self.state, &self.context, event) {
            Ok(r) => r,
            Err(e) => {
                // Rejections are user-facing (e.g., "request already in progress")
                tracing::warn!(error = %e, mode = ?self.state.mode, "Rejected event");
                let _ = self.broadcast_tx.send(ViewEvent::Rejected {
                    message: e.to_string(),
                });
                return;
            }
        };

        self.state = result.new_state;
        self.state_tx.send_replace(self.state.clone());

        for effect in result.effects {
            self.execute_effect(effect);
        }
    }

    /// Liveness check against the Chat API; failure only logs
    fn spawn_probe(&self) {
        let backend = self.backend.clone();
        let persona = self.state.selected_persona.clone();
        tokio::spawn(async move {
            match backend.probe_persona(&persona).await {
                Ok(()) => tracing::info!(persona = %persona, "Persona available"),
                Err(e) => tracing::warn!(
                    persona = %persona,
                    error = %e,
                    "Persona probe failed"
                ),
            }
        });
    }

    /// Execute an effect; I/O runs on spawned tasks that report back as events
    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::NotifyMessage(message) => {
                let _ = self.broadcast_tx.send(ViewEvent::Message { message });
            }

            Effect::NotifyCleared => {
                let _ = self.broadcast_tx.send(ViewEvent::Cleared);
            }

            Effect::PublishState => {
                let _ = self.broadcast_tx.send(ViewEvent::StateChange {
                    state: StateSnapshot::from(&self.state),
                });
            }

            Effect::RequestTurn { request, epoch } => {
                let backend = self.backend.clone();
                let event_tx = self.event_tx.clone();
                let cancel_token = self.cancel_token.clone();

                tokio::spawn(async move {
                    tracing::info!(
                        persona = %request.town_person,
                        auto_julie = request.auto_julie.unwrap_or(false),
                        epoch,
                        "Sending turn"
                    );

                    // Race the request against cancellation
                    tokio::select! {
                        biased;

                        () = cancel_token.cancelled() => {
                            tracing::info!(epoch, "Turn request cancelled");
                        }

                        result = backend.send_turn(&request) => {
                            let event = match result {
                                Ok(reply) => Event::TurnSucceeded { epoch, reply },
                                Err(e) => Event::TurnFailed { epoch, message: e.message },
                            };
                            let _ = event_tx.send(event).await;
                        }
                    }
                });
            }

            Effect::RequestTranscript { request, epoch } => {
                let backend = self.backend.clone();
                let event_tx = self.event_tx.clone();
                let cancel_token = self.cancel_token.clone();

                tokio::spawn(async move {
                    tracing::info!(persona = %request.town_person, epoch, "Requesting transcript");

                    tokio::select! {
                        biased;

                        () = cancel_token.cancelled() => {
                            tracing::info!(epoch, "Transcript request cancelled");
                        }

                        result = backend.generate_transcript(&request) => {
                            let event = match result {
                                Ok(reply) => Event::TranscriptReceived { epoch, reply },
                                Err(e) => Event::TranscriptFailed { epoch, message: e.message },
                            };
                            let _ = event_tx.send(event).await;
                        }
                    }
                });
            }

            Effect::ClearSession { persona, epoch } => {
                let backend = self.backend.clone();
                let event_tx = self.event_tx.clone();
                let cancel_token = self.cancel_token.clone();

                tokio::spawn(async move {
                    tokio::select! {
                        biased;

                        () = cancel_token.cancelled() => {}

                        result = backend.clear_session(&persona) => {
                            // Best effort: the restart proceeds either way
                            if let Err(e) = result {
                                tracing::warn!(
                                    persona = %persona,
                                    error = %e,
                                    "Failed to clear server session"
                                );
                            }
                            let _ = event_tx.send(Event::SessionCleared { epoch }).await;
                        }
                    }
                });
            }

            Effect::AbortRequests => {
                tracing::debug!("Aborting in-flight requests");
                let token = std::mem::replace(&mut self.cancel_token, CancellationToken::new());
                token.cancel();
            }

            Effect::ScheduleTimer {
                timer,
                delay,
                epoch,
            } => {
                let event_tx = self.event_tx.clone();
                let cancel_token = self.cancel_token.clone();

                tokio::spawn(async move {
                    tokio::select! {
                        () = cancel_token.cancelled() => {}
                        () = tokio::time::sleep(delay) => {
                            let _ = event_tx.send(Event::TimerFired { timer, epoch }).await;
                        }
                    }
                });
            }
        }
    }
}
