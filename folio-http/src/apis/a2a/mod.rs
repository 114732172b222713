//! Agent-to-agent (A2A) protocol endpoints, mounted under `/a2a`.

mod card;
mod handler;

pub use card::{AgentCapabilities, AgentCard, AgentSkill};
pub use handler::{JsonRpcRequest, JsonRpcResponse, A2A_USER_ID};

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::relay::MessageRelay;

#[derive(Debug, thiserror::Error)]
pub enum A2aError {
    #[error("agent card url must be an absolute http(s) url: {0}")]
    InvalidCardUrl(String),
}

#[derive(Clone)]
pub struct A2aState {
    pub card: Arc<AgentCard>,
    pub relay: Arc<MessageRelay>,
}

/// Build the A2A sub-application; the caller decides what to do on failure
pub fn router(
    relay: Arc<MessageRelay>,
    description: &str,
    card_url: &str,
) -> Result<Router, A2aError> {
    let card = AgentCard::new(relay.app_name(), description, card_url)?;
    let state = A2aState {
        card: Arc::new(card),
        relay,
    };

    Ok(Router::new()
        .route("/", post(handler::handle_rpc))
        .route("/.well-known/agent.json", get(handler::agent_card))
        .with_state(state))
}
