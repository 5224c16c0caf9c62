//! Wire types for the external Chat API

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Top-level generation mode understood by `POST /chat`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    Interactive,
    Auto,
}

/// Body of `POST /chat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub town_person: String,
    pub user_input: String,
    pub mode: ChatMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_julie: Option<bool>,
}

impl ChatRequest {
    /// A line typed by the operator (or typed on Julie's behalf)
    pub fn interactive(
        persona: impl Into<String>,
        text: impl Into<String>,
        speaker: impl Into<String>,
    ) -> Self {
        Self {
            town_person: persona.into(),
            user_input: text.into(),
            mode: ChatMode::Interactive,
            speaker: Some(speaker.into()),
            auto_julie: None,
        }
    }

    /// Ask the backend to synthesize Julie's next line from context alone
    pub fn auto_julie(persona: impl Into<String>) -> Self {
        Self {
            town_person: persona.into(),
            user_input: String::new(),
            mode: ChatMode::Interactive,
            speaker: Some("Julie".to_string()),
            auto_julie: Some(true),
        }
    }

    /// Ask for a complete generated transcript
    pub fn transcript(persona: impl Into<String>) -> Self {
        Self {
            town_person: persona.into(),
            user_input: String::new(),
            mode: ChatMode::Auto,
            speaker: None,
            auto_julie: None,
        }
    }
}

/// Introspection metadata attached to a generated line.
///
/// Opaque to the controller; only the inspector looks inside it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievedInfo {
    #[serde(default, alias = "fullPrompt", skip_serializing_if = "Option::is_none")]
    pub full_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Categories that, paired with a final stage, end a conversation
const TERMINAL_CATEGORIES: &[&str] = &["progression", "final_refusal"];

/// Response to an interactive or auto-Julie turn
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TurnReply {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default, rename = "julieResponse")]
    pub julie_response: Option<String>,
    #[serde(default)]
    pub retrieved_info: Option<RetrievedInfo>,
    #[serde(default, rename = "julieRetrievedInfo")]
    pub julie_retrieved_info: Option<RetrievedInfo>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub decision_response: Option<Value>,
    #[serde(default)]
    pub conversation_ended: bool,
}

impl TurnReply {
    /// Termination signal of the typed-turn path: a terminal category whose
    /// retrieved info reports the final stage.
    pub fn reached_final_stage(&self) -> bool {
        let terminal_category = self
            .category
            .as_deref()
            .is_some_and(|c| TERMINAL_CATEGORIES.contains(&c));
        let final_stage = self
            .retrieved_info
            .as_ref()
            .and_then(|info| info.stage.as_deref())
            == Some("final");
        terminal_category && final_stage
    }
}

/// Response to a full-transcript request
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TranscriptReply {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub transcript: Option<String>,
    /// Parallel to the non-blank transcript lines; entries may be null
    #[serde(default)]
    pub retrieved_info: Vec<Option<RetrievedInfo>>,
    #[serde(default)]
    pub decision: Option<Value>,
}
