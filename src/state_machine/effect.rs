//! Effects produced by state transitions

use crate::chat_api::ChatRequest;
use crate::state_machine::event::Timer;
use crate::state_machine::state::Message;
use std::time::Duration;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// A message was appended to the history
    NotifyMessage(Message),

    /// The history was emptied
    NotifyCleared,

    /// Mode, speaker, pending flag or indicator changed
    PublishState,

    /// Send one turn to the Chat API; answers with `TurnSucceeded`/`TurnFailed`
    RequestTurn { request: ChatRequest, epoch: u64 },

    /// Ask for a full transcript; answers with `TranscriptReceived`/`TranscriptFailed`
    RequestTranscript { request: ChatRequest, epoch: u64 },

    /// Clear server-side history; answers with `SessionCleared`
    ClearSession { persona: String, epoch: u64 },

    /// Cancel in-flight Chat API calls and pending timers
    AbortRequests,

    /// Fire `TimerFired` after `delay`
    ScheduleTimer {
        timer: Timer,
        delay: Duration,
        epoch: u64,
    },
}

impl Effect {
    pub fn notify(message: Message) -> Self {
        Effect::NotifyMessage(message)
    }

    pub fn schedule(timer: Timer, delay: Duration, epoch: u64) -> Self {
        Effect::ScheduleTimer {
            timer,
            delay,
            epoch,
        }
    }
}
