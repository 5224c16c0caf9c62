//! Server-Sent Events support

use super::types::ConversationResponse;
use crate::runtime::ViewEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Convert broadcast stream to SSE stream
pub fn sse_stream(
    init: ConversationResponse,
    broadcast_rx: tokio::sync::broadcast::Receiver<ViewEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Create stream that starts with init event then broadcasts
    let init = futures::stream::once(async move { Ok(init_event(&init)) });

    let broadcasts = BroadcastStream::new(broadcast_rx).filter_map(|result| match result {
        Ok(event) => Some(Ok(view_event_to_axum(event))),
        Err(e) => {
            tracing::warn!(error = %e, "SSE subscriber lagged");
            None
        }
    });

    let combined = init.chain(broadcasts);

    Sse::new(combined).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn init_event(init: &ConversationResponse) -> Event {
    let data = json!({
        "type": "init",
        "state": init.state,
        "messages": init.messages,
        "features": init.features,
    });
    Event::default().event("init").data(data.to_string())
}

fn view_event_to_axum(event: ViewEvent) -> Event {
    let (event_type, data) = match event {
        ViewEvent::Message { message } => (
            "message",
            json!({
                "type": "message",
                "message": message
            }),
        ),
        ViewEvent::Cleared => (
            "cleared",
            json!({
                "type": "cleared"
            }),
        ),
        ViewEvent::StateChange { state } => (
            "state_change",
            json!({
                "type": "state_change",
                "state": state
            }),
        ),
        ViewEvent::Rejected { message } => (
            "rejected",
            json!({
                "type": "rejected",
                "message": message
            }),
        ),
    };

    Event::default().event(event_type).data(data.to_string())
}
