//! HTTP API for the chat view
//!
//! Every control in the browser maps to one POST that is queued as an
//! [`Event`](crate::state_machine::Event); rendering is driven by the SSE
//! stream.

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::runtime::ConversationHandle;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub conversation: ConversationHandle,
}

impl AppState {
    pub fn new(conversation: ConversationHandle) -> Self {
        Self { conversation }
    }
}
