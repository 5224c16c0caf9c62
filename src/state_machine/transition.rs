//! Pure state transition function
//!
//! Given the same state, context and event this always produces the same
//! new state and effects; all I/O is described by the returned effects.

use super::event::Timer;
use super::state::{
    ChatContext, ConversationState, InteractionMode, JulieStyle, RequestKind, Speaker,
    TranscriptPlayback,
};
use super::{Effect, Event};
use crate::chat_api::{ChatRequest, TranscriptReply, TurnReply};
use crate::decision::DecisionStatus;
use crate::transcript::parse_transcript;
use serde_json::Value;
use thiserror::Error;
use std::time::Duration;

const AUTO_JULIE_ACTIVATED: &str =
    "Auto Julie mode activated. Julie will handle the conversation automatically.";
const GENERATING_TRANSCRIPT: &str = "Generating conversation... This may take a moment.";
const UNKNOWN_FORMAT: &str = "Received an unknown response format from the server.";
const JULIE_SILENT: &str = "Julie tried to respond but no message was returned from the server";
const FINAL_STAGE_ENDED: &str = "Conversation Ended";
const CONVERSATION_CONCLUDED: &str = "This conversation has reached its conclusion.";
const NO_TRANSCRIPT: &str = "No transcript received from server";
const RESTARTING_AUTO: &str = "Restarting conversation in Auto Mode...";
const RESTARTED_JULIE: &str = "Conversation restarted. Auto Julie will begin the conversation.";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConversationState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConversationState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("A request is already in progress")]
    Busy,
    #[error("The conversation has ended; restart to continue")]
    ConversationEnded,
    #[error("Typed input is not accepted in {0:?} mode")]
    InputUnavailable(InteractionMode),
    #[error("The {0} is disabled")]
    FeatureDisabled(&'static str),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
pub fn transition(
    state: &ConversationState,
    context: &ChatContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    let mut s = state.clone();
    let mut fx = Vec::new();

    match event {
        // ============================================================
        // Operator intents
        // ============================================================
        Event::SubmitTurn { text } => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(TransitionResult::new(s));
            }
            if !s.mode.accepts_typed_input() {
                return Err(TransitionError::InputUnavailable(s.mode));
            }
            if s.ended {
                return Err(TransitionError::ConversationEnded);
            }
            if s.is_pending() {
                return Err(TransitionError::Busy);
            }

            let speaker = if s.mode == InteractionMode::JulieManual {
                Speaker::Julie
            } else {
                s.current_speaker.clone()
            };
            let request = ChatRequest::interactive(&s.selected_persona, text, speaker.label());
            fx.push(Effect::notify(s.append(speaker, text, None)));
            let epoch = s.begin(RequestKind::Turn);
            fx.push(Effect::PublishState);
            fx.push(Effect::RequestTurn { request, epoch });
        }

        Event::SelectDirect => match s.mode {
            InteractionMode::AutoTranscript => {
                return Err(TransitionError::InvalidTransition(
                    "handler selection is unavailable in auto mode".to_string(),
                ))
            }
            InteractionMode::Direct => {}
            InteractionMode::JulieAuto | InteractionMode::JulieManual => {
                s.mode = InteractionMode::Direct;
                fx.push(Effect::PublishState);
            }
        },

        Event::SelectJulie => match s.mode {
            InteractionMode::AutoTranscript => {
                return Err(TransitionError::InvalidTransition(
                    "handler selection is unavailable in auto mode".to_string(),
                ))
            }
            InteractionMode::JulieAuto | InteractionMode::JulieManual => {}
            InteractionMode::Direct => {
                let style = s.julie_style;
                enter_julie(&mut s, style, &mut fx);
                fx.push(Effect::PublishState);
            }
        },

        Event::SetJulieStyle { style } => {
            s.julie_style = style;
            if s.mode.is_julie() && s.mode != style.mode() {
                enter_julie(&mut s, style, &mut fx);
            }
            fx.push(Effect::PublishState);
        }

        Event::ToggleSpeaker => {
            if !context.features.speaker_toggle {
                return Err(TransitionError::FeatureDisabled("speaker toggle"));
            }
            if s.mode != InteractionMode::Direct {
                return Err(TransitionError::InvalidTransition(format!(
                    "speaker toggle requires direct mode, not {:?}",
                    s.mode
                )));
            }
            s.current_speaker = if s.current_speaker == Speaker::Operator {
                s.persona_speaker()
            } else {
                Speaker::Operator
            };
            fx.push(Effect::PublishState);
        }

        Event::SelectAutoTranscript => begin_transcript(&mut s, &mut fx),

        Event::SelectInteractive => {
            s.reset();
            s.mode = InteractionMode::Direct;
            s.current_speaker = Speaker::Operator;
            fx.push(Effect::AbortRequests);
            fx.push(Effect::NotifyCleared);
            let text = format!(
                "You're now in interactive mode. You can chat with {} directly.",
                s.selected_persona
            );
            notice(&mut s, text, &mut fx);
            fx.push(Effect::PublishState);
        }

        Event::Restart => {
            s.reset();
            s.current_speaker = Speaker::Operator;
            fx.push(Effect::AbortRequests);
            fx.push(Effect::NotifyCleared);
            let epoch = s.begin(RequestKind::ClearSession);
            fx.push(Effect::PublishState);
            fx.push(Effect::ClearSession {
                persona: s.selected_persona.clone(),
                epoch,
            });
        }

        // ============================================================
        // Chat API results
        // ============================================================
        Event::TurnSucceeded { epoch, reply } => {
            if s.awaits(RequestKind::Turn, epoch) {
                typed_turn_reply(&mut s, context, reply, &mut fx);
            } else if s.awaits(RequestKind::AutoJulie, epoch) {
                auto_julie_reply(&mut s, context, reply, &mut fx);
            }
        }

        Event::TurnFailed { epoch, message } => {
            if s.awaits(RequestKind::Turn, epoch) || s.awaits(RequestKind::AutoJulie, epoch) {
                s.pending = None;
                notice(&mut s, format!("Error: {message}"), &mut fx);
                fx.push(Effect::PublishState);
            }
        }

        Event::TranscriptReceived { epoch, reply } => {
            if s.awaits(RequestKind::Transcript, epoch) && s.playback.is_none() {
                transcript_reply(&mut s, context, reply, &mut fx);
            }
        }

        Event::TranscriptFailed { epoch, message } => {
            if s.awaits(RequestKind::Transcript, epoch) && s.playback.is_none() {
                transcript_failed(&mut s, &message, &mut fx);
            }
        }

        Event::SessionCleared { epoch } => {
            if s.awaits(RequestKind::ClearSession, epoch) {
                s.pending = None;
                let delay = context.pacing.restart_delay;
                match s.mode {
                    InteractionMode::AutoTranscript => {
                        notice(&mut s, RESTARTING_AUTO, &mut fx);
                        fx.push(Effect::schedule(Timer::TranscriptRequest, delay, s.epoch));
                    }
                    InteractionMode::JulieAuto => {
                        notice(&mut s, RESTARTED_JULIE, &mut fx);
                        fx.push(schedule_auto_turn(&s, delay));
                    }
                    InteractionMode::Direct | InteractionMode::JulieManual => {
                        let text = format!(
                            "Conversation restarted. You can now chat with {}.",
                            s.selected_persona
                        );
                        notice(&mut s, text, &mut fx);
                    }
                }
                fx.push(Effect::PublishState);
            }
        }

        // ============================================================
        // Timers
        // ============================================================
        Event::TimerFired { timer, epoch } => {
            if epoch != s.epoch {
                return Ok(TransitionResult::new(s));
            }
            match timer {
                Timer::AutoJulieTurn { run } => {
                    if run == s.julie_run
                        && s.mode == InteractionMode::JulieAuto
                        && !s.is_pending()
                        && !s.ended
                    {
                        start_auto_turn(&mut s, &mut fx);
                        fx.push(Effect::PublishState);
                    }
                }
                Timer::TranscriptRequest => {
                    if s.mode == InteractionMode::AutoTranscript && !s.is_pending() {
                        begin_transcript(&mut s, &mut fx);
                    }
                }
                Timer::TranscriptLine => {
                    if s.awaits(RequestKind::Transcript, epoch) {
                        reveal_next_line(&mut s, context, &mut fx);
                    }
                }
            }
        }
    }

    Ok(TransitionResult::new(s).with_effects(fx))
}

// ============================================================================
// Helpers
// ============================================================================

/// Append a `System` notice
fn notice(s: &mut ConversationState, text: impl Into<String>, fx: &mut Vec<Effect>) {
    fx.push(Effect::notify(s.append(Speaker::System, text, None)));
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}

fn apply_decision(s: &mut ConversationState, context: &ChatContext, value: Option<&Value>) {
    if !context.features.decision_indicator {
        return;
    }
    if let Some(status) = value.and_then(|v| DecisionStatus::from_value(v, &context.sentiments)) {
        s.decision = Some(status);
    }
}

fn enter_julie(s: &mut ConversationState, style: JulieStyle, fx: &mut Vec<Effect>) {
    s.mode = style.mode();
    if s.mode == InteractionMode::JulieAuto {
        s.julie_run += 1;
        notice(s, AUTO_JULIE_ACTIVATED, fx);
        if !s.is_pending() && !s.ended {
            start_auto_turn(s, fx);
        }
    }
}

/// Arm the next auto-Julie turn for the current run and epoch
fn schedule_auto_turn(s: &ConversationState, delay: Duration) -> Effect {
    Effect::schedule(Timer::AutoJulieTurn { run: s.julie_run }, delay, s.epoch)
}

fn start_auto_turn(s: &mut ConversationState, fx: &mut Vec<Effect>) {
    let epoch = s.begin(RequestKind::AutoJulie);
    fx.push(Effect::RequestTurn {
        request: ChatRequest::auto_julie(&s.selected_persona),
        epoch,
    });
}

/// Set `ended`, append the terminal notice and leave auto Julie
fn end_conversation(s: &mut ConversationState, text: &str, fx: &mut Vec<Effect>) {
    s.ended = true;
    notice(s, text, fx);
    if s.mode == InteractionMode::JulieAuto {
        s.mode = InteractionMode::Direct;
    }
}

fn typed_turn_reply(
    s: &mut ConversationState,
    context: &ChatContext,
    reply: TurnReply,
    fx: &mut Vec<Effect>,
) {
    s.pending = None;
    apply_decision(s, context, reply.decision_response.as_ref());
    let final_stage = reply.reached_final_stage();

    if let Some(error) = reply.error {
        notice(s, format!("Error: {error}"), fx);
        fx.push(Effect::PublishState);
        return;
    }

    match (non_empty(reply.julie_response), non_empty(reply.response)) {
        (Some(julie), Some(response)) => {
            fx.push(Effect::notify(s.append(Speaker::Julie, julie, reply.julie_retrieved_info)));
            let persona = s.persona_speaker();
            fx.push(Effect::notify(s.append(persona, response, reply.retrieved_info)));
        }
        (None, Some(response)) => {
            let persona = s.persona_speaker();
            fx.push(Effect::notify(s.append(persona, response, reply.retrieved_info)));
        }
        _ => notice(s, UNKNOWN_FORMAT, fx),
    }

    if final_stage {
        end_conversation(s, FINAL_STAGE_ENDED, fx);
    } else {
        match s.mode {
            InteractionMode::JulieAuto => {
                fx.push(schedule_auto_turn(s, context.pacing.auto_turn_delay));
            }
            InteractionMode::Direct if s.current_speaker != Speaker::Operator => {
                s.current_speaker = Speaker::Operator;
            }
            _ => {}
        }
    }
    fx.push(Effect::PublishState);
}

fn auto_julie_reply(
    s: &mut ConversationState,
    context: &ChatContext,
    reply: TurnReply,
    fx: &mut Vec<Effect>,
) {
    s.pending = None;

    if let Some(error) = reply.error {
        notice(s, format!("Error: {error}"), fx);
        fx.push(Effect::PublishState);
        return;
    }

    apply_decision(s, context, reply.decision_response.as_ref());

    match non_empty(reply.julie_response) {
        Some(julie) => {
            fx.push(Effect::notify(s.append(Speaker::Julie, julie, reply.julie_retrieved_info)));
        }
        None => notice(s, JULIE_SILENT, fx),
    }
    if let Some(response) = non_empty(reply.response) {
        let persona = s.persona_speaker();
        fx.push(Effect::notify(s.append(persona, response, reply.retrieved_info)));
    }

    if reply.conversation_ended {
        end_conversation(s, CONVERSATION_CONCLUDED, fx);
    } else if s.mode == InteractionMode::JulieAuto && !s.ended {
        fx.push(schedule_auto_turn(s, context.pacing.auto_turn_delay));
    }
    fx.push(Effect::PublishState);
}

/// Reset into auto mode and ask for a full transcript
fn begin_transcript(s: &mut ConversationState, fx: &mut Vec<Effect>) {
    s.reset();
    s.mode = InteractionMode::AutoTranscript;
    s.current_speaker = Speaker::Operator;
    fx.push(Effect::AbortRequests);
    fx.push(Effect::NotifyCleared);
    notice(s, GENERATING_TRANSCRIPT, fx);
    let epoch = s.begin(RequestKind::Transcript);
    fx.push(Effect::PublishState);
    fx.push(Effect::RequestTranscript {
        request: ChatRequest::transcript(&s.selected_persona),
        epoch,
    });
}

fn transcript_reply(
    s: &mut ConversationState,
    context: &ChatContext,
    reply: TranscriptReply,
    fx: &mut Vec<Effect>,
) {
    if let Some(error) = reply.error {
        transcript_failed(s, &error, fx);
        return;
    }
    let Some(transcript) = non_empty(reply.transcript) else {
        transcript_failed(s, NO_TRANSCRIPT, fx);
        return;
    };

    s.clear_messages();
    fx.push(Effect::NotifyCleared);
    s.playback = Some(TranscriptPlayback {
        lines: parse_transcript(&transcript, &reply.retrieved_info).into(),
        decision: reply.decision,
    });

    if s.playback.as_ref().is_some_and(|p| p.lines.is_empty()) {
        finish_playback(s, context, fx);
    } else {
        fx.push(Effect::schedule(
            Timer::TranscriptLine,
            context.pacing.transcript_line_delay,
            s.epoch,
        ));
    }
}

fn transcript_failed(s: &mut ConversationState, message: &str, fx: &mut Vec<Effect>) {
    s.pending = None;
    s.clear_messages();
    fx.push(Effect::NotifyCleared);
    notice(s, format!("Error generating conversation: {message}"), fx);
    fx.push(Effect::PublishState);
}

fn reveal_next_line(s: &mut ConversationState, context: &ChatContext, fx: &mut Vec<Effect>) {
    let Some(line) = s.playback.as_mut().and_then(|p| p.lines.pop_front()) else {
        return;
    };
    fx.push(Effect::notify(s.append(line.speaker, line.text, line.retrieved_info)));

    if s.playback.as_ref().is_some_and(|p| p.lines.is_empty()) {
        finish_playback(s, context, fx);
    } else {
        fx.push(Effect::schedule(
            Timer::TranscriptLine,
            context.pacing.transcript_line_delay,
            s.epoch,
        ));
    }
}

fn finish_playback(s: &mut ConversationState, context: &ChatContext, fx: &mut Vec<Effect>) {
    let decision = s.playback.take().and_then(|p| p.decision);
    apply_decision(s, context, decision.as_ref());
    s.pending = None;
    fx.push(Effect::PublishState);
}
