use axum::{
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use super::{A2aState, AgentCard};
use crate::relay::{RelayError, RequestLifecycle, Stage};
use crate::streaming::sse_response;
use folio_core::{Content, EventStream, Part, USER_ROLE};

pub const A2A_USER_ID: &str = "a2a_user";

const PARSE_ERROR: i32 = -32700;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const INTERNAL_ERROR: i32 = -32603;

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    fn result(id: Value, result: Value) -> Self {
        Self { jsonrpc: "2.0", id, result: Some(result), error: None }
    }

    fn error(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError { code, message: message.into() }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum A2aPart {
    Text { text: String },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct A2aMessage {
    #[serde(default = "default_role")]
    pub role: String,
    pub parts: Vec<A2aPart>,
    #[serde(default)]
    pub context_id: Option<String>,
}

fn default_role() -> String {
    USER_ROLE.to_string()
}

#[derive(Debug, Deserialize)]
pub struct MessageSendParams {
    pub message: A2aMessage,
}

pub async fn agent_card(State(state): State<A2aState>) -> Json<AgentCard> {
    Json(state.card.as_ref().clone())
}

/// JSON-RPC entry point for `message/send` and `message/stream`
pub async fn handle_rpc(State(state): State<A2aState>, body: Bytes) -> Response {
    let request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => return Json(JsonRpcResponse::error(Value::Null, PARSE_ERROR, e.to_string())).into_response(),
    };

    match request.method.as_str() {
        "message/send" => Json(message_send(&state, request.id, request.params).await).into_response(),
        "message/stream" => message_stream(&state, request.id, request.params).await,
        other => {
            warn!("A2A method not supported: {}", other);
            Json(JsonRpcResponse::error(request.id, METHOD_NOT_FOUND, format!("method not found: {}", other)))
                .into_response()
        }
    }
}

fn parse_params(params: Value) -> Result<(Content, Option<String>), String> {
    let params: MessageSendParams = serde_json::from_value(params).map_err(|e| e.to_string())?;
    if params.message.parts.is_empty() {
        return Err("message.parts must not be empty".to_string());
    }
    let content = Content::new(
        params.message.role,
        params
            .message
            .parts
            .into_iter()
            .map(|A2aPart::Text { text }| Part::text(text))
            .collect(),
    );
    Ok((content, params.message.context_id))
}

fn agent_message(context_id: &str, text: Option<&str>) -> Value {
    let parts: Vec<Value> = text
        .into_iter()
        .map(|text| json!({"kind": "text", "text": text}))
        .collect();
    json!({
        "kind": "message",
        "role": "agent",
        "messageId": Uuid::new_v4().to_string(),
        "contextId": context_id,
        "parts": parts,
    })
}

async fn message_send(state: &A2aState, id: Value, params: Value) -> JsonRpcResponse {
    let (content, context_id) = match parse_params(params) {
        Ok(parsed) => parsed,
        Err(message) => return JsonRpcResponse::error(id, INVALID_PARAMS, message),
    };

    let request_id = Uuid::new_v4().to_string();
    info!("[{}] A2A message/send", request_id);

    match state.relay.run(&request_id, A2A_USER_ID, context_id, content).await {
        Ok(outcome) => JsonRpcResponse::result(
            id,
            agent_message(&outcome.session_id, outcome.response.as_deref()),
        ),
        Err(e) => JsonRpcResponse::error(id, INTERNAL_ERROR, e.to_string()),
    }
}

/// Streams one `status-update` per runner event as SSE; the terminal event
/// carries `final: true`. A runner failure is sent as a JSON-RPC error frame.
async fn message_stream(state: &A2aState, id: Value, params: Value) -> Response {
    let (content, context_id) = match parse_params(params) {
        Ok(parsed) => parsed,
        Err(message) => return Json(JsonRpcResponse::error(id, INVALID_PARAMS, message)).into_response(),
    };

    let request_id = Uuid::new_v4().to_string();
    info!("[{}] A2A message/stream", request_id);

    let lifecycle = RequestLifecycle::new(request_id.clone(), "a2a_stream");
    match state.relay.open_stream(lifecycle, A2A_USER_ID, context_id, content).await {
        Ok((key, events, lifecycle)) => {
            sse_response(status_updates(id, request_id, key.session_id, events, lifecycle))
        }
        Err(e) => Json(JsonRpcResponse::error(id, INTERNAL_ERROR, e.to_string())).into_response(),
    }
}

fn status_updates(
    id: Value,
    task_id: String,
    context_id: String,
    mut events: EventStream,
    mut lifecycle: RequestLifecycle,
) -> impl Stream<Item = Result<Bytes, RelayError>> + Send + 'static {
    async_stream::stream! {
        lifecycle.advance(Stage::StreamingEvents);
        while let Some(event) = events.next().await {
            let response = match event {
                Ok(event) => {
                    let last = event.is_final_response();
                    let text = event.content.as_ref().and_then(|c| c.last_text());
                    JsonRpcResponse::result(
                        id.clone(),
                        json!({
                            "kind": "status-update",
                            "taskId": task_id,
                            "contextId": context_id,
                            "status": {
                                "state": if last { "completed" } else { "working" },
                                "message": agent_message(&context_id, text),
                            },
                            "final": last,
                        }),
                    )
                }
                Err(e) => {
                    yield rpc_frame(&JsonRpcResponse::error(id.clone(), INTERNAL_ERROR, e.to_string()));
                    return;
                }
            };
            yield rpc_frame(&response);
        }
        lifecycle.advance(Stage::Finalized);
    }
}

fn rpc_frame(response: &JsonRpcResponse) -> Result<Bytes, RelayError> {
    let json = serde_json::to_string(response)?;
    Ok(Bytes::from(format!("data: {json}\n\n")))
}
