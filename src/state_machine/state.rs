//! Conversation state types

use crate::chat_api::RetrievedInfo;
use crate::decision::{DecisionStatus, SentimentTable};
use crate::transcript::TranscriptLine;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

// ============================================================================
// Modes and Speakers
// ============================================================================

/// Who drives the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InteractionMode {
    /// The operator types, as themselves or (toggled) as the persona
    #[default]
    Direct,
    /// Julie's lines are generated automatically, turn after turn
    JulieAuto,
    /// The operator types Julie's lines
    JulieManual,
    /// The backend generates the whole conversation in one request
    AutoTranscript,
}

impl InteractionMode {
    pub fn is_julie(self) -> bool {
        matches!(self, Self::JulieAuto | Self::JulieManual)
    }

    /// Whether the text input is shown at all in this mode
    pub fn accepts_typed_input(self) -> bool {
        matches!(self, Self::Direct | Self::JulieManual)
    }
}

/// Nested toggle remembered while Julie mode is off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JulieStyle {
    #[default]
    Auto,
    Manual,
}

impl JulieStyle {
    pub fn mode(self) -> InteractionMode {
        match self {
            Self::Auto => InteractionMode::JulieAuto,
            Self::Manual => InteractionMode::JulieManual,
        }
    }
}

/// Author of a message
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Speaker {
    Operator,
    Julie,
    /// The simulated town person, by display name
    Persona(String),
    /// Local notices; never sent to the backend
    System,
}

impl Speaker {
    /// Parse a speaker label; the fixed speakers match case-insensitively
    pub fn from_label(label: &str) -> Self {
        match label.to_lowercase().as_str() {
            "operator" => Self::Operator,
            "julie" => Self::Julie,
            "system" => Self::System,
            _ => Self::Persona(label.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Operator => "Operator",
            Self::Julie => "Julie",
            Self::Persona(name) => name,
            Self::System => "System",
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Messages
// ============================================================================

/// One rendered line of the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// 1-based, strictly increasing by one until the next reset
    pub sequence: u32,
    pub sender: Speaker,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieved_info: Option<RetrievedInfo>,
}

// ============================================================================
// Pending Work
// ============================================================================

/// Kind of the single outstanding operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// A typed turn (operator, persona-as-typed, or manual Julie)
    Turn,
    /// A generated Julie turn
    AutoJulie,
    /// Transcript request or transcript playback
    Transcript,
    /// Best-effort server-side history clear during restart
    ClearSession,
}

/// The re-entrancy guard: at most one of these exists at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequest {
    pub kind: RequestKind,
    pub epoch: u64,
}

/// Transcript lines waiting to be revealed
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TranscriptPlayback {
    pub lines: VecDeque<TranscriptLine>,
    /// Applied to the decision indicator after the last line
    pub decision: Option<serde_json::Value>,
}

// ============================================================================
// Conversation State
// ============================================================================

/// Everything the controller owns about one conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub mode: InteractionMode,
    pub julie_style: JulieStyle,
    pub current_speaker: Speaker,
    pub selected_persona: String,
    pub messages: Vec<Message>,
    next_sequence: u32,
    pub pending: Option<PendingRequest>,
    pub ended: bool,
    /// Bumped on every reset; results from older epochs are discarded
    pub epoch: u64,
    /// Bumped each time auto Julie is entered; timers armed by an earlier run are dropped
    #[serde(default)]
    pub julie_run: u64,
    #[serde(default)]
    pub playback: Option<TranscriptPlayback>,
    #[serde(default)]
    pub decision: Option<DecisionStatus>,
}

impl ConversationState {
    pub fn new(persona: impl Into<String>) -> Self {
        Self {
            mode: InteractionMode::Direct,
            julie_style: JulieStyle::Auto,
            current_speaker: Speaker::Operator,
            selected_persona: persona.into(),
            messages: Vec::new(),
            next_sequence: 1,
            pending: None,
            ended: false,
            epoch: 0,
            julie_run: 0,
            playback: None,
            decision: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_kind(&self) -> Option<RequestKind> {
        self.pending.map(|p| p.kind)
    }

    /// Whether the input field and send button are usable
    pub fn input_enabled(&self) -> bool {
        !self.is_pending() && !self.ended && self.mode.accepts_typed_input()
    }

    pub fn persona_speaker(&self) -> Speaker {
        Speaker::Persona(self.selected_persona.clone())
    }

    pub fn message(&self, sequence: u32) -> Option<&Message> {
        self.messages.iter().find(|m| m.sequence == sequence)
    }

    /// Append a message, assigning the next sequence number
    pub fn append(
        &mut self,
        sender: Speaker,
        text: impl Into<String>,
        retrieved_info: Option<RetrievedInfo>,
    ) -> Message {
        let message = Message {
            sequence: self.next_sequence,
            sender,
            text: text.into(),
            retrieved_info,
        };
        self.next_sequence += 1;
        self.messages.push(message.clone());
        message
    }

    /// Drop all messages and restart numbering at 1
    pub fn clear_messages(&mut self) {
        self.messages.clear();
        self.next_sequence = 1;
    }

    /// Start over: empty history, no pending work, not ended, fresh epoch
    pub fn reset(&mut self) {
        self.clear_messages();
        self.pending = None;
        self.ended = false;
        self.playback = None;
        self.decision = None;
        self.epoch += 1;
    }

    pub(crate) fn begin(&mut self, kind: RequestKind) -> u64 {
        self.pending = Some(PendingRequest {
            kind,
            epoch: self.epoch,
        });
        self.epoch
    }

    /// Whether a result tagged `(kind, epoch)` answers the outstanding request
    pub(crate) fn awaits(&self, kind: RequestKind, epoch: u64) -> bool {
        self.pending == Some(PendingRequest { kind, epoch })
    }
}

// ============================================================================
// Context
// ============================================================================

/// Optional affordances that differed between the chat widgets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChatFeatures {
    pub speaker_toggle: bool,
    pub inspect_retrieved: bool,
    pub decision_indicator: bool,
}

impl Default for ChatFeatures {
    fn default() -> Self {
        Self {
            speaker_toggle: true,
            inspect_retrieved: true,
            decision_indicator: true,
        }
    }
}

/// UI cadence constants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Gap between generated Julie turns
    pub auto_turn_delay: Duration,
    /// Gap between the restart notice and the first generated turn
    pub restart_delay: Duration,
    /// Gap between revealed transcript lines
    pub transcript_line_delay: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            auto_turn_delay: Duration::from_secs(5),
            restart_delay: Duration::from_millis(500),
            transcript_line_delay: Duration::from_secs(1),
        }
    }
}

/// Immutable configuration for a controller
#[derive(Debug, Clone, Default)]
pub struct ChatContext {
    pub features: ChatFeatures,
    pub pacing: Pacing,
    pub sentiments: SentimentTable,
}

impl ChatContext {
    pub fn new(features: ChatFeatures, pacing: Pacing) -> Self {
        Self {
            features,
            pacing,
            sentiments: SentimentTable::default(),
        }
    }

    #[allow(dead_code)] // Swappable keyword table for localized backends
    pub fn with_sentiments(mut self, sentiments: SentimentTable) -> Self {
        self.sentiments = sentiments;
        self
    }
}
