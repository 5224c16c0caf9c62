//! Decision indicator
//!
//! The backend reports the persona's evacuation stance as free text. The
//! indicator maps that text onto a closed set of sentiments with an ordered
//! keyword table; the first matching row wins.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Closed set of indicator states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecisionSentiment {
    Positive,
    TrendingPositive,
    Negative,
    TrendingNegative,
    Undecided,
    Neutral,
}

/// Ordered substring table used by [`SentimentTable::classify`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentimentTable {
    rules: Vec<(DecisionSentiment, Vec<String>)>,
}

impl SentimentTable {
    /// Build a table from `(sentiment, keywords)` rows, checked in order.
    /// Keywords are matched case-insensitively.
    pub fn new<I, K>(rules: I) -> Self
    where
        I: IntoIterator<Item = (DecisionSentiment, K)>,
        K: IntoIterator,
        K::Item: Into<String>,
    {
        Self {
            rules: rules
                .into_iter()
                .map(|(sentiment, keywords)| {
                    let keywords = keywords
                        .into_iter()
                        .map(|k| k.into().to_lowercase())
                        .collect();
                    (sentiment, keywords)
                })
                .collect(),
        }
    }

    pub fn classify(&self, text: &str) -> DecisionSentiment {
        let lowered = text.to_lowercase();
        self.rules
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k.as_str())))
            .map_or(DecisionSentiment::Neutral, |(sentiment, _)| *sentiment)
    }
}

impl Default for SentimentTable {
    // Phrase rows come before single-word rows, and "unlikely" is checked
    // before "likely".
    fn default() -> Self {
        Self::new([
            (
                DecisionSentiment::TrendingPositive,
                vec!["trending toward evacuation", "initially positive"],
            ),
            (
                DecisionSentiment::TrendingNegative,
                vec!["trending toward refusing", "initially resistant"],
            ),
            (
                DecisionSentiment::Undecided,
                vec!["showing resistance but still engaging", "undecided"],
            ),
            (
                DecisionSentiment::Negative,
                vec!["refuse", "reject", "negative", "resist", "unlikely"],
            ),
            (
                DecisionSentiment::Positive,
                vec!["evacuate", "agree", "positive", "likely"],
            ),
        ])
    }
}

/// What the indicator currently shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionStatus {
    pub label: String,
    pub sentiment: DecisionSentiment,
}

impl DecisionStatus {
    /// Interpret a raw `decision_response` / `decision` field.
    ///
    /// Returns `None` for `null`, which leaves the indicator untouched.
    pub fn from_value(value: &Value, table: &SentimentTable) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(label) => Some(Self {
                label: label.clone(),
                sentiment: table.classify(label),
            }),
            _ => Some(Self {
                label: "Unknown".to_string(),
                sentiment: DecisionSentiment::Neutral,
            }),
        }
    }
}
