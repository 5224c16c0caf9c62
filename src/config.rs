//! Environment configuration
//!
//! Read once at startup. Only the persona is required; everything else has
//! a default.

use crate::state_machine::{ChatFeatures, Pacing};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_API_URL: &str = "http://localhost:8001";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("TOWN_CHAT_PERSONA is not set; a persona must be selected before the chat view starts")]
    MissingPersona,
    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

/// Process-wide settings for the chat service
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    pub persona: String,
    pub api_url: String,
    pub port: u16,
    pub request_timeout: Duration,
    pub features: ChatFeatures,
    pub pacing: Pacing,
}

impl ChatConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let persona = lookup("TOWN_CHAT_PERSONA")
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .ok_or(ConfigError::MissingPersona)?;

        let defaults = ChatFeatures::default();
        let features = ChatFeatures {
            speaker_toggle: flag(&lookup, "TOWN_CHAT_SPEAKER_TOGGLE", defaults.speaker_toggle)?,
            inspect_retrieved: flag(&lookup, "TOWN_CHAT_INSPECT", defaults.inspect_retrieved)?,
            decision_indicator: flag(
                &lookup,
                "TOWN_CHAT_DECISION_INDICATOR",
                defaults.decision_indicator,
            )?,
        };

        let defaults = Pacing::default();
        let pacing = Pacing {
            auto_turn_delay: millis(&lookup, "TOWN_CHAT_AUTO_TURN_DELAY_MS", defaults.auto_turn_delay)?,
            restart_delay: millis(&lookup, "TOWN_CHAT_RESTART_DELAY_MS", defaults.restart_delay)?,
            transcript_line_delay: millis(
                &lookup,
                "TOWN_CHAT_LINE_DELAY_MS",
                defaults.transcript_line_delay,
            )?,
        };

        Ok(Self {
            persona,
            api_url: lookup("TOWN_CHAT_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            port: number(&lookup, "TOWN_CHAT_PORT")?.unwrap_or(DEFAULT_PORT),
            request_timeout: Duration::from_secs(
                number(&lookup, "TOWN_CHAT_REQUEST_TIMEOUT_SECS")?
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            features,
            pacing,
        })
    }
}

fn number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    lookup(name)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue { name, value })
        })
        .transpose()
}

fn millis(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    Ok(number(lookup, name)?.map_or(default, Duration::from_millis))
}

fn flag(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => match value.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue { name, value }),
        },
    }
}
