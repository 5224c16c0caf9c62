//! External Chat API
//!
//! Typed request/response shapes and the HTTP client the runtime uses to
//! generate turns, transcripts and to clear server-side session history.

mod client;
mod error;
mod types;

pub use client::ChatApiClient;
pub use error::{ChatApiError, ChatApiErrorKind};
pub use types::*;
