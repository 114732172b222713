use axum::{extract::State, Json};

use crate::apis::agent::HealthResponse;
use crate::ServerState;

/// Liveness only; neither the session store nor the runner is consulted
pub async fn health_check(State(state): State<ServerState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        agent: state.agent_name.to_string(),
    })
}
