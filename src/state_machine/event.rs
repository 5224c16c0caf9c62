//! Events that can occur in a conversation

use crate::chat_api::{TranscriptReply, TurnReply};
use crate::state_machine::state::JulieStyle;
use serde::{Deserialize, Serialize};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // Operator intents
    SubmitTurn {
        text: String,
    },
    SelectDirect,
    SelectJulie,
    SetJulieStyle {
        style: JulieStyle,
    },
    ToggleSpeaker,
    SelectAutoTranscript,
    SelectInteractive,
    Restart,

    // Chat API results, tagged with the epoch they were issued in
    TurnSucceeded {
        epoch: u64,
        reply: TurnReply,
    },
    TurnFailed {
        epoch: u64,
        message: String,
    },
    TranscriptReceived {
        epoch: u64,
        reply: TranscriptReply,
    },
    TranscriptFailed {
        epoch: u64,
        message: String,
    },
    /// Clear-session finished; failures are logged and reported the same way
    SessionCleared {
        epoch: u64,
    },

    // Timers
    TimerFired {
        timer: Timer,
        epoch: u64,
    },
}

/// Delayed follow-ups scheduled by the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timer {
    /// Request the next generated Julie turn for one auto-Julie run
    AutoJulieTurn { run: u64 },
    /// Begin a transcript after an auto-mode restart
    TranscriptRequest,
    /// Reveal the next buffered transcript line
    TranscriptLine,
}
