//! Click-to-inspect rendering of retrieved info

use crate::chat_api::RetrievedInfo;
use serde::Serialize;
use serde_json::Value;

const UNAVAILABLE: &str = "No generation details available for this message.";

/// What the inspector panel shows for one message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RetrievedView {
    FullPrompt {
        title: String,
        prompt: String,
    },
    Examples {
        category: Option<String>,
        speaker: Option<String>,
        examples: Vec<String>,
    },
    Context {
        context: String,
    },
    Unavailable {
        notice: String,
    },
}

/// Pick the view by priority: full prompt, then category/examples, then
/// context, then the placeholder.
pub fn describe(info: Option<&RetrievedInfo>) -> RetrievedView {
    let Some(info) = info else {
        return unavailable();
    };

    if let Some(prompt) = &info.full_prompt {
        let speaker = info.speaker.as_deref().unwrap_or_default().to_lowercase();
        let title = if speaker == "julie" {
            "Julie's Generation Prompt:".to_string()
        } else {
            format!("{speaker}'s Response Generation:")
        };
        return RetrievedView::FullPrompt {
            title,
            prompt: prompt.clone(),
        };
    }

    if info.category.is_some() || !info.examples.is_empty() {
        return RetrievedView::Examples {
            category: info.category.clone(),
            speaker: info.speaker.clone(),
            examples: info.examples.iter().map(value_text).collect(),
        };
    }

    match &info.context {
        Some(Value::Null) | None => unavailable(),
        Some(context) => RetrievedView::Context {
            context: value_text(context),
        },
    }
}

fn unavailable() -> RetrievedView {
    RetrievedView::Unavailable {
        notice: UNAVAILABLE.to_string(),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}
