//! HTTP client for the external Chat API

use super::types::{ChatRequest, TranscriptReply, TurnReply};
use super::ChatApiError;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};

/// Thin `reqwest` wrapper around the Chat API endpoints
#[derive(Debug, Clone)]
pub struct ChatApiClient {
    client: Client,
    base_url: String,
}

impl ChatApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ChatApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChatApiError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST /chat` for a single turn
    pub async fn send_turn(&self, request: &ChatRequest) -> Result<TurnReply, ChatApiError> {
        self.post_chat(request).await
    }

    /// `POST /chat` in auto mode, returning the whole transcript at once
    pub async fn generate_transcript(
        &self,
        request: &ChatRequest,
    ) -> Result<TranscriptReply, ChatApiError> {
        self.post_chat(request).await
    }

    /// `POST /clear-session/{persona}`
    pub async fn clear_session(&self, persona: &str) -> Result<(), ChatApiError> {
        let url = self.persona_url("clear-session", persona)?;
        let response = self
            .client
            .post(url)
            .header("content-type", "application/json")
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatApiError::status(status.as_u16(), &body));
        }
        Ok(())
    }

    /// `GET /persona/{persona}`, used as a liveness probe
    pub async fn probe_persona(&self, persona: &str) -> Result<(), ChatApiError> {
        let url = self.persona_url("persona", persona)?;
        let response = self.client.get(url).send().await.map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatApiError::status(status.as_u16(), &body));
        }
        Ok(())
    }

    /// `{base}/{route}/{persona}` with the persona encoded as one path segment
    fn persona_url(&self, route: &str, persona: &str) -> Result<Url, ChatApiError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ChatApiError::network(format!("Invalid Chat API URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| ChatApiError::network("Chat API URL cannot take a path"))?
            .pop_if_empty()
            .push(route)
            .push(persona);
        Ok(url)
    }

    async fn post_chat<T: DeserializeOwned>(&self, request: &ChatRequest) -> Result<T, ChatApiError> {
        let url = format!("{}/chat", self.base_url);
        let start = Instant::now();

        let result: Result<T, ChatApiError> = async {
            let response = self
                .client
                .post(&url)
                .header("content-type", "application/json")
                .json(request)
                .send()
                .await
                .map_err(transport_error)?;

            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| ChatApiError::network(format!("Failed to read response: {e}")))?;

            if !status.is_success() {
                return Err(ChatApiError::status(status.as_u16(), &body));
            }

            parse_body(&body)
        }
        .await;

        let duration_ms = start.elapsed().as_millis();
        match &result {
            Ok(_) => tracing::info!(
                persona = %request.town_person,
                mode = ?request.mode,
                duration_ms = %duration_ms,
                "Chat request completed"
            ),
            Err(e) if e.kind.is_server_side() => tracing::error!(
                persona = %request.town_person,
                duration_ms = %duration_ms,
                error = %e.message,
                "Chat request failed"
            ),
            Err(e) => tracing::warn!(
                persona = %request.town_person,
                duration_ms = %duration_ms,
                error = %e.message,
                kind = ?e.kind,
                "Chat request failed"
            ),
        }

        result
    }
}

fn transport_error(e: reqwest::Error) -> ChatApiError {
    if e.is_timeout() {
        ChatApiError::network(format!("Request timeout: {e}"))
    } else if e.is_connect() {
        ChatApiError::network(format!("Connection failed: {e}"))
    } else {
        ChatApiError::network(format!("Request failed: {e}"))
    }
}

/// Decode a JSON body, treating `null` as a malformed response
fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, ChatApiError> {
    let parsed: Option<T> = serde_json::from_str(body)
        .map_err(|e| ChatApiError::malformed(format!("Failed to parse response: {e}")))?;
    parsed.ok_or_else(|| ChatApiError::malformed("Received null or undefined response from server"))
}
