//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::chat_api::{ChatApiClient, ChatApiError, ChatRequest, TranscriptReply, TurnReply};
use async_trait::async_trait;
use std::sync::Arc;

/// Backend that generates conversation turns
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send one turn (typed or auto-Julie)
    async fn send_turn(&self, request: &ChatRequest) -> Result<TurnReply, ChatApiError>;

    /// Generate a complete transcript
    async fn generate_transcript(
        &self,
        request: &ChatRequest,
    ) -> Result<TranscriptReply, ChatApiError>;

    /// Discard server-side history for a persona
    async fn clear_session(&self, persona: &str) -> Result<(), ChatApiError>;

    /// Check the persona exists
    async fn probe_persona(&self, persona: &str) -> Result<(), ChatApiError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: ChatBackend + ?Sized> ChatBackend for Arc<T> {
    async fn send_turn(&self, request: &ChatRequest) -> Result<TurnReply, ChatApiError> {
        (**self).send_turn(request).await
    }

    async fn generate_transcript(
        &self,
        request: &ChatRequest,
    ) -> Result<TranscriptReply, ChatApiError> {
        (**self).generate_transcript(request).await
    }

    async fn clear_session(&self, persona: &str) -> Result<(), ChatApiError> {
        (**self).clear_session(persona).await
    }

    async fn probe_persona(&self, persona: &str) -> Result<(), ChatApiError> {
        (**self).probe_persona(persona).await
    }
}

// ============================================================================
// Production implementation
// ============================================================================

#[async_trait]
impl ChatBackend for ChatApiClient {
    async fn send_turn(&self, request: &ChatRequest) -> Result<TurnReply, ChatApiError> {
        ChatApiClient::send_turn(self, request).await
    }

    async fn generate_transcript(
        &self,
        request: &ChatRequest,
    ) -> Result<TranscriptReply, ChatApiError> {
        ChatApiClient::generate_transcript(self, request).await
    }

    async fn clear_session(&self, persona: &str) -> Result<(), ChatApiError> {
        ChatApiClient::clear_session(self, persona).await
    }

    async fn probe_persona(&self, persona: &str) -> Result<(), ChatApiError> {
        ChatApiClient::probe_persona(self, persona).await
    }
}
