//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    ConversationResponse, ErrorResponse, Handler, HandlerRequest, JulieStyleRequest, ModeRequest,
    QueuedResponse, TopLevelMode, TurnRequest,
};
use super::AppState;
use crate::inspect::{describe, RetrievedView};
use crate::runtime::StateSnapshot;
use crate::state_machine::{ConversationState, Event};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Snapshot and live view
        .route("/api/conversation", get(get_conversation))
        .route("/api/conversation/stream", get(stream_conversation))
        // Operator intents
        .route("/api/conversation/turn", post(submit_turn))
        .route("/api/conversation/mode", post(select_mode))
        .route("/api/conversation/handler", post(select_handler))
        .route("/api/conversation/julie-style", post(set_julie_style))
        .route("/api/conversation/speaker/toggle", post(toggle_speaker))
        .route("/api/conversation/restart", post(restart))
        // Click-to-inspect
        .route(
            "/api/conversation/messages/:seq/retrieved",
            get(get_retrieved_info),
        )
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Snapshot and Streaming
// ============================================================

fn conversation_response(state: &AppState, conversation: ConversationState) -> ConversationResponse {
    ConversationResponse {
        state: StateSnapshot::from(&conversation),
        messages: conversation.messages,
        features: state.conversation.context().features,
    }
}

async fn get_conversation(State(state): State<AppState>) -> Json<ConversationResponse> {
    Json(conversation_response(&state, state.conversation.state()))
}

async fn stream_conversation(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let (conversation, broadcast_rx) = state
        .conversation
        .attach()
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(sse_stream(
        conversation_response(&state, conversation),
        broadcast_rx,
    ))
}

// ============================================================
// Operator Intents
// ============================================================

async fn queue(state: &AppState, event: Event) -> Result<Json<QueuedResponse>, AppError> {
    state
        .conversation
        .send(event)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(QueuedResponse { queued: true }))
}

async fn submit_turn(
    State(state): State<AppState>,
    Json(req): Json<TurnRequest>,
) -> Result<Json<QueuedResponse>, AppError> {
    queue(&state, Event::SubmitTurn { text: req.text }).await
}

async fn select_mode(
    State(state): State<AppState>,
    Json(req): Json<ModeRequest>,
) -> Result<Json<QueuedResponse>, AppError> {
    let event = match req.mode {
        TopLevelMode::Auto => Event::SelectAutoTranscript,
        TopLevelMode::Interactive => Event::SelectInteractive,
    };
    queue(&state, event).await
}

async fn select_handler(
    State(state): State<AppState>,
    Json(req): Json<HandlerRequest>,
) -> Result<Json<QueuedResponse>, AppError> {
    let event = match req.handler {
        Handler::Direct => Event::SelectDirect,
        Handler::Julie => Event::SelectJulie,
    };
    queue(&state, event).await
}

async fn set_julie_style(
    State(state): State<AppState>,
    Json(req): Json<JulieStyleRequest>,
) -> Result<Json<QueuedResponse>, AppError> {
    queue(&state, Event::SetJulieStyle { style: req.style }).await
}

async fn toggle_speaker(State(state): State<AppState>) -> Result<Json<QueuedResponse>, AppError> {
    if !state.conversation.context().features.speaker_toggle {
        return Err(AppError::NotFound("Speaker toggle is disabled".to_string()));
    }
    queue(&state, Event::ToggleSpeaker).await
}

async fn restart(State(state): State<AppState>) -> Result<Json<QueuedResponse>, AppError> {
    queue(&state, Event::Restart).await
}

// ============================================================
// Click-to-inspect
// ============================================================

async fn get_retrieved_info(
    State(state): State<AppState>,
    Path(seq): Path<u32>,
) -> Result<Json<RetrievedView>, AppError> {
    if !state.conversation.context().features.inspect_retrieved {
        return Err(AppError::NotFound(
            "Retrieved info inspection is disabled".to_string(),
        ));
    }

    let conversation = state.conversation.state();
    let message = conversation
        .message(seq)
        .ok_or_else(|| AppError::NotFound(format!("Message not found: {seq}")))?;

    Ok(Json(describe(message.retrieved_info.as_ref())))
}

async fn get_version() -> &'static str {
    concat!("town_chat ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    NotFound(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
