use axum::{extract::State, response::Response, Json};
use tracing::info;
use uuid::Uuid;

use super::types::{RunRequest, SessionCreateRequest, SessionCreateResponse};
use crate::error::{ApiError, ApiJson};
use crate::relay::RunOutcome;
use crate::streaming::sse_response;
use crate::ServerState;

/// Create (or overwrite) a session
pub async fn create_session(
    State(state): State<ServerState>,
    ApiJson(payload): ApiJson<SessionCreateRequest>,
) -> Result<Json<SessionCreateResponse>, ApiError> {
    let request_id = Uuid::new_v4().to_string();
    info!("[{}] POST /sessions", request_id);

    let key = state
        .relay
        .create_session(&request_id, &payload.user_id, payload.session_id)
        .await?;

    Ok(Json(SessionCreateResponse {
        session_id: key.session_id,
        user_id: key.user_id,
        app_name: key.app_name,
    }))
}

/// Run the agent and return the complete response
pub async fn run_agent(
    State(state): State<ServerState>,
    ApiJson(payload): ApiJson<RunRequest>,
) -> Result<Json<RunOutcome>, ApiError> {
    payload.validate()?;
    let request_id = Uuid::new_v4().to_string();
    info!("[{}] POST /run", request_id);

    let outcome = state
        .relay
        .run(
            &request_id,
            &payload.user_id,
            payload.session_id,
            payload.new_message.into_content(),
        )
        .await?;

    info!("[{}] - [{}] Completed with {} events", request_id, outcome.session_id, outcome.events.len());
    Ok(Json(outcome))
}

/// Run the agent with Server-Sent Events streaming
pub async fn run_agent_sse(
    State(state): State<ServerState>,
    ApiJson(payload): ApiJson<RunRequest>,
) -> Result<Response, ApiError> {
    payload.validate()?;
    let request_id = Uuid::new_v4().to_string();
    info!("[{}] POST /run_sse", request_id);

    let stream = state
        .relay
        .run_streaming(
            &request_id,
            &payload.user_id,
            payload.session_id,
            payload.new_message.into_content(),
        )
        .await?;

    Ok(sse_response(stream))
}
