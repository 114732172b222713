//! End-to-end tests for the HTTP surface with a scripted agent runner.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use folio_core::{
    AgentRunner, Content, Event, EventStream, InMemorySessionService, RunRequest, RunnerError,
    Session, SessionError, SessionKey, SessionService,
};
use folio_http::{build_router, MessageRelay, ServerConfig, ServerState};
use serde_json::{json, Value};
use tower::ServiceExt;

const EMAIL: &str = "contact@vishalpandey.co.in";

/// Answers every turn with one terminal event, or fails after a partial
struct StubRunner {
    reply: &'static str,
    fail_after_partial: bool,
    calls: Mutex<Vec<RunRequest>>,
}

impl StubRunner {
    fn replying(reply: &'static str) -> Self {
        Self { reply, fail_after_partial: false, calls: Mutex::new(Vec::new()) }
    }

    fn failing() -> Self {
        Self { reply: "", fail_after_partial: true, calls: Mutex::new(Vec::new()) }
    }
}

impl AgentRunner for StubRunner {
    fn app_name(&self) -> &str {
        "llama_assistant"
    }

    fn run(&self, request: RunRequest) -> EventStream {
        self.calls.lock().unwrap().push(request);
        let author = Some("llama_assistant".to_string());
        let events = if self.fail_after_partial {
            vec![
                Ok(Event::new("inv", author, Some(Content::model_text("part"))).into_partial()),
                Err(RunnerError::EmptyResponse),
            ]
        } else {
            vec![Ok(Event::new("inv", author, Some(Content::model_text(self.reply))))]
        };
        Box::pin(futures::stream::iter(events))
    }
}

/// Counts store calls so tests can check no session work happened
#[derive(Default)]
struct CountingStore {
    inner: InMemorySessionService,
    calls: AtomicUsize,
}

#[async_trait]
impl SessionService for CountingStore {
    async fn create_session(&self, key: &SessionKey) -> Result<Session, SessionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.create_session(key).await
    }

    async fn get_session(&self, key: &SessionKey) -> Result<Session, SessionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_session(key).await
    }

    async fn append_event(&self, key: &SessionKey, event: Event) -> Result<(), SessionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.append_event(key, event).await
    }
}

struct TestApp {
    router: Router,
    store: Arc<CountingStore>,
    runner: Arc<StubRunner>,
}

fn app_with(runner: StubRunner, config: &ServerConfig) -> TestApp {
    let store = Arc::new(CountingStore::default());
    let runner = Arc::new(runner);
    let relay = Arc::new(MessageRelay::new(store.clone(), runner.clone()));
    let state = ServerState::new(relay, "test agent");
    TestApp { router: build_router(state, config), store, runner }
}

fn app(runner: StubRunner) -> TestApp {
    app_with(runner, &ServerConfig::default())
}

async fn post_json(router: &Router, uri: &str, body: Value) -> (StatusCode, Vec<u8>) {
    let response = router
        .clone()
        .oneshot(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

fn run_body(text: &str) -> Value {
    json!({"new_message": {"role": "user", "parts": [{"text": text}]}})
}

fn data_frames(body: &str) -> Vec<&str> {
    body.lines().filter_map(|l| l.strip_prefix("data: ")).collect()
}

#[tokio::test]
async fn health_needs_no_collaborators() {
    let test = app(StubRunner::replying(EMAIL));
    let response = test
        .router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json, json!({"status": "healthy", "agent": "llama_assistant"}));
    assert_eq!(test.store.calls.load(Ordering::SeqCst), 0);
    assert!(test.runner.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn run_returns_final_response_text() {
    let test = app(StubRunner::replying(EMAIL));
    let (status, body) = post_json(&test.router, "/run", run_body("What's his email?")).await;

    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["response"], EMAIL);
    let events = json["events"].as_array().unwrap();
    assert_eq!(events.last().unwrap()["is_final"], true);
    assert_eq!(events[0]["author"], "llama_assistant");
    assert_eq!(events[0]["content"]["parts"][0]["text"], EMAIL);

    let calls = test.runner.calls.lock().unwrap();
    assert_eq!(calls[0].user_id, "default_user");
    assert_eq!(calls[0].new_message.first_text(), Some("What's his email?"));
}

#[tokio::test]
async fn run_without_session_id_generates_distinct_ids() {
    let test = app(StubRunner::replying("ok"));
    let mut ids = HashSet::new();
    for _ in 0..5 {
        let (_, body) = post_json(&test.router, "/run", run_body("hi")).await;
        let json: Value = serde_json::from_slice(&body).unwrap();
        let id = json["session_id"].as_str().unwrap().to_string();
        assert!(!id.is_empty());
        ids.insert(id);
    }
    assert_eq!(ids.len(), 5);
}

#[tokio::test]
async fn run_reuses_caller_session() {
    let test = app(StubRunner::replying("ok"));
    let mut body = run_body("hi");
    body["session_id"] = json!("session-fixed");
    body["user_id"] = json!("visitor");

    let (_, first) = post_json(&test.router, "/run", body.clone()).await;
    let (_, second) = post_json(&test.router, "/run", body).await;

    let first: Value = serde_json::from_slice(&first).unwrap();
    let second: Value = serde_json::from_slice(&second).unwrap();
    assert_eq!(first["session_id"], "session-fixed");
    assert_eq!(second["session_id"], "session-fixed");

    let key = SessionKey::new("llama_assistant", "visitor", "session-fixed");
    assert!(test.store.get_session(&key).await.is_ok());
}

#[tokio::test]
async fn empty_parts_rejected_before_session_work() {
    let test = app(StubRunner::replying(EMAIL));
    let (status, body) = post_json(
        &test.router,
        "/run",
        json!({"new_message": {"role": "user", "parts": []}}),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"]["code"], "validation_error");
    assert_eq!(test.store.calls.load(Ordering::SeqCst), 0);
    assert!(test.runner.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_message_is_rejected() {
    let test = app(StubRunner::replying(EMAIL));
    let (status, _) = post_json(&test.router, "/run_sse", json!({"user_id": "u"})).await;

    assert!(status.is_client_error());
    assert_eq!(test.store.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn run_failure_is_server_error() {
    let test = app(StubRunner::failing());
    let (status, body) = post_json(&test.router, "/run", run_body("hi")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"]["type"], "server_error");
}

#[tokio::test]
async fn run_sse_emits_event_then_done() {
    let test = app(StubRunner::replying(EMAIL));
    let response = test
        .router
        .clone()
        .oneshot(
            Request::post("/run_sse")
                .header("content-type", "application/json")
                .body(Body::from(run_body("What's his email?").to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["content-type"], "text/event-stream");
    assert_eq!(headers["cache-control"], "no-cache");
    assert_eq!(headers["x-accel-buffering"], "no");

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = String::from_utf8(body.to_vec()).unwrap();
    let frames = data_frames(&body);

    assert_eq!(frames.len(), 2);
    let event: Value = serde_json::from_str(frames[0]).unwrap();
    assert_eq!(event["text"], EMAIL);
    assert_eq!(event["is_final"], true);
    assert_eq!(event["author"], "llama_assistant");
    assert_eq!(frames[1], "[DONE]");
    assert!(body.ends_with("data: [DONE]\n\n"));
}

#[tokio::test]
async fn run_sse_failure_truncates_stream() {
    let test = app(StubRunner::failing());
    let response = test
        .router
        .clone()
        .oneshot(
            Request::post("/run_sse")
                .header("content-type", "application/json")
                .body(Body::from(run_body("hi").to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    // headers were already committed; the failure shows up as a broken body
    assert_eq!(response.status(), StatusCode::OK);
    assert!(to_bytes(response.into_body(), usize::MAX).await.is_err());
}

#[tokio::test]
async fn create_session_twice_is_not_an_error() {
    let test = app(StubRunner::replying("ok"));
    let body = json!({"user_id": "visitor", "session_id": "session-dup"});

    let (first, first_body) = post_json(&test.router, "/sessions", body.clone()).await;
    let (second, _) = post_json(&test.router, "/sessions", body).await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);
    let json: Value = serde_json::from_slice(&first_body).unwrap();
    assert_eq!(
        json,
        json!({"session_id": "session-dup", "user_id": "visitor", "app_name": "llama_assistant"})
    );
}

#[tokio::test]
async fn create_session_defaults() {
    let test = app(StubRunner::replying("ok"));
    let (status, body) = post_json(&test.router, "/sessions", json!({})).await;

    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["user_id"], "default_user");
    assert!(json["session_id"].as_str().unwrap().starts_with("session-"));
}

#[tokio::test]
async fn a2a_card_is_served() {
    let test = app(StubRunner::replying("ok"));
    let response = test
        .router
        .clone()
        .oneshot(Request::get("/a2a/.well-known/agent.json").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let card: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(card["name"], "llama_assistant");
    assert_eq!(card["description"], "test agent");
    assert_eq!(card["url"], "http://localhost:8000/a2a");
    assert_eq!(card["capabilities"]["streaming"], true);
}

#[tokio::test]
async fn a2a_message_send_relays_to_agent() {
    let test = app(StubRunner::replying(EMAIL));
    let (status, body) = post_json(
        &test.router,
        "/a2a",
        json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "message/send",
            "params": {"message": {
                "role": "user",
                "messageId": "m1",
                "contextId": "ctx-1",
                "parts": [{"kind": "text", "text": "What's his email?"}]
            }}
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["id"], 7);
    assert_eq!(json["result"]["contextId"], "ctx-1");
    assert_eq!(json["result"]["role"], "agent");
    assert_eq!(json["result"]["parts"][0]["text"], EMAIL);
    assert_eq!(test.runner.calls.lock().unwrap()[0].user_id, "a2a_user");
}

#[tokio::test]
async fn a2a_unknown_method_is_rpc_error() {
    let test = app(StubRunner::replying("ok"));
    let (_, body) = post_json(
        &test.router,
        "/a2a",
        json!({"jsonrpc": "2.0", "id": "x", "method": "tasks/cancel", "params": {}}),
    )
    .await;

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"]["code"], -32601);
}

fn stream_request(context_id: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": 9,
        "method": "message/stream",
        "params": {"message": {
            "role": "user",
            "contextId": context_id,
            "parts": [{"kind": "text", "text": "What's his email?"}]
        }}
    })
}

#[tokio::test]
async fn a2a_message_stream_sends_final_status_update() {
    let test = app(StubRunner::replying(EMAIL));
    let response = test
        .router
        .clone()
        .oneshot(
            Request::post("/a2a")
                .header("content-type", "application/json")
                .body(Body::from(stream_request("ctx-2").to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/event-stream");
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = String::from_utf8(body.to_vec()).unwrap();
    let frames = data_frames(&body);
    assert_eq!(frames.len(), 1);

    let update: Value = serde_json::from_str(frames[0]).unwrap();
    assert_eq!(update["id"], 9);
    assert_eq!(update["result"]["kind"], "status-update");
    assert_eq!(update["result"]["contextId"], "ctx-2");
    assert_eq!(update["result"]["final"], true);
    assert_eq!(update["result"]["status"]["state"], "completed");
    assert_eq!(update["result"]["status"]["message"]["parts"][0]["text"], EMAIL);

    let calls = test.runner.calls.lock().unwrap();
    assert_eq!(calls[0].user_id, "a2a_user");
    assert_eq!(calls[0].config.streaming_mode, folio_core::StreamingMode::Sse);
}

#[tokio::test]
async fn a2a_message_stream_reports_runner_failure() {
    let test = app(StubRunner::failing());
    let (status, body) = post_json(&test.router, "/a2a", stream_request("ctx-3")).await;

    assert_eq!(status, StatusCode::OK);
    let body = String::from_utf8(body).unwrap();
    let frames = data_frames(&body);
    assert_eq!(frames.len(), 2);

    let working: Value = serde_json::from_str(frames[0]).unwrap();
    assert_eq!(working["result"]["final"], false);
    assert_eq!(working["result"]["status"]["state"], "working");
    let failed: Value = serde_json::from_str(frames[1]).unwrap();
    assert_eq!(failed["error"]["code"], -32603);
}

#[tokio::test]
async fn a2a_message_stream_rejects_empty_parts() {
    let test = app(StubRunner::replying("ok"));
    let (_, body) = post_json(
        &test.router,
        "/a2a",
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "message/stream",
            "params": {"message": {"role": "user", "parts": []}}
        }),
    )
    .await;

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"]["code"], -32602);
    assert_eq!(test.store.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn invalid_a2a_url_skips_mount_but_serves_rest() {
    let config = ServerConfig {
        a2a_url: "not a url".to_string(),
        ..ServerConfig::default()
    };
    let test = app_with(StubRunner::replying(EMAIL), &config);

    let card = test
        .router
        .clone()
        .oneshot(Request::get("/a2a/.well-known/agent.json").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(card.status(), StatusCode::NOT_FOUND);

    let (status, _) = post_json(&test.router, "/run", run_body("hi")).await;
    assert_eq!(status, StatusCode::OK);
}
