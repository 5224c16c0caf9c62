//! Town Chat - evacuation conversation simulator
//!
//! Serves the chat view for one town persona. The operator talks to the
//! persona directly, lets Julie mediate, or has the whole conversation
//! generated by the Chat API.

mod api;
mod chat_api;
mod config;
mod decision;
mod inspect;
mod runtime;
mod state_machine;
mod transcript;

use api::{create_router, AppState};
use chat_api::ChatApiClient;
use config::ChatConfig;
use state_machine::ChatContext;
use std::net::SocketAddr;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "town_chat=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration; no persona means no chat view
    let config = match ChatConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    let client = ChatApiClient::new(&config.api_url, config.request_timeout)?;
    tracing::info!(
        persona = %config.persona,
        api_url = %client.base_url(),
        features = ?config.features,
        "Chat API client initialized"
    );

    let context = ChatContext::new(config.features, config.pacing);
    let conversation = runtime::start_conversation(config.persona.clone(), context, client);
    let state = AppState::new(conversation);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Town chat server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
