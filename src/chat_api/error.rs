//! Chat API error types

use thiserror::Error;

/// Chat API error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ChatApiError {
    pub kind: ChatApiErrorKind,
    pub message: String,
}

impl ChatApiError {
    pub fn new(kind: ChatApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ChatApiErrorKind::Network, message)
    }

    pub fn status(code: u16, body: &str) -> Self {
        let message = if body.trim().is_empty() {
            format!("HTTP {code}")
        } else {
            format!("HTTP {code}: {}", body.trim())
        };
        Self::new(ChatApiErrorKind::Status(code), message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ChatApiErrorKind::Malformed, message)
    }
}

/// Error classification
///
/// Every kind is recovered locally by the controller; none of them is retried
/// automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatApiErrorKind {
    /// Connection failures, timeouts, unreadable bodies
    Network,
    /// Non-2xx HTTP status
    Status(u16),
    /// Body was null, not JSON, or missing required fields
    Malformed,
}

impl ChatApiErrorKind {
    pub fn is_server_side(self) -> bool {
        matches!(self, Self::Status(code) if code >= 500)
    }
}
