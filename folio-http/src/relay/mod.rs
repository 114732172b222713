mod lifecycle;

pub use lifecycle::{RequestLifecycle, Stage};

use std::sync::Arc;

use bytes::Bytes;
use folio_core::{
    generate_session_id, AgentRunner, Content, Event, EventStream, RunConfig, RunRequest, RunnerError,
    SessionError, SessionKey, SessionService, StreamingMode,
};
use futures::{Stream, StreamExt};
use serde::Serialize;
use tracing::{debug, info};

use crate::streaming::create_sse_stream;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Runner(#[from] RunnerError),
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One consumed event as reported by the synchronous path
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    pub author: Option<String>,
    pub content: Option<Content>,
    pub is_final: bool,
}

impl From<&Event> for EventRecord {
    fn from(event: &Event) -> Self {
        Self {
            author: event.author.clone(),
            content: event.content.clone(),
            is_final: event.is_final_response(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub session_id: String,
    pub response: Option<String>,
    pub events: Vec<EventRecord>,
}

/// Relays inbound messages to the agent runner, resolving the session first
pub struct MessageRelay {
    sessions: Arc<dyn SessionService>,
    runner: Arc<dyn AgentRunner>,
}

impl MessageRelay {
    pub fn new(sessions: Arc<dyn SessionService>, runner: Arc<dyn AgentRunner>) -> Self {
        Self { sessions, runner }
    }

    pub fn app_name(&self) -> &str {
        self.runner.app_name()
    }

    fn key(&self, user_id: &str, session_id: Option<String>) -> SessionKey {
        let session_id = session_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(generate_session_id);
        SessionKey::new(self.app_name(), user_id, session_id)
    }

    /// Register a session, overwriting any session with the same id
    pub async fn create_session(
        &self,
        request_id: &str,
        user_id: &str,
        session_id: Option<String>,
    ) -> Result<SessionKey, RelayError> {
        let key = self.key(user_id, session_id);
        self.sessions.create_session(&key).await?;
        info!("[{}] - [{}] Session created", request_id, key.session_id);
        Ok(key)
    }

    /// Fetch-or-create. Only a missing session falls through to creation;
    /// any other store error fails the request. Two concurrent first requests
    /// for the same id may both create it, the second overwriting the first.
    async fn resolve_session(
        &self,
        lifecycle: &mut RequestLifecycle,
        user_id: &str,
        session_id: Option<String>,
    ) -> Result<SessionKey, RelayError> {
        let key = self.key(user_id, session_id);
        match self.sessions.get_session(&key).await {
            Ok(_) => {
                debug!("[{}] - [{}] Using existing session", lifecycle.request_id(), key.session_id);
            }
            Err(SessionError::NotFound(_)) => {
                info!("[{}] - [{}] Creating new session", lifecycle.request_id(), key.session_id);
                self.sessions.create_session(&key).await?;
            }
            Err(e) => return Err(e.into()),
        }
        lifecycle.resolved(&key.session_id);
        Ok(key)
    }

    fn submit(&self, key: &SessionKey, message: Content, streaming_mode: StreamingMode) -> EventStream {
        self.runner.run(RunRequest {
            user_id: key.user_id.clone(),
            session_id: key.session_id.clone(),
            new_message: message,
            config: RunConfig { streaming_mode },
        })
    }

    /// Run one turn and aggregate every event; returns once the runner's
    /// stream is exhausted.
    pub async fn run(
        &self,
        request_id: &str,
        user_id: &str,
        session_id: Option<String>,
        message: Content,
    ) -> Result<RunOutcome, RelayError> {
        let mut lifecycle = RequestLifecycle::new(request_id, "run");
        let key = self.resolve_session(&mut lifecycle, user_id, session_id).await?;

        let mut events = self.submit(&key, message, StreamingMode::None);
        lifecycle.advance(Stage::Submitted);
        lifecycle.advance(Stage::StreamingEvents);

        let mut records = Vec::new();
        let mut response = None;
        while let Some(event) = events.next().await {
            let event = event?;
            let record = EventRecord::from(&event);
            if record.is_final {
                if let Some(text) = event.content.as_ref().and_then(|c| c.first_text()) {
                    response = Some(text.to_string());
                }
            }
            records.push(record);
        }

        lifecycle.advance(Stage::Finalized);
        Ok(RunOutcome {
            session_id: key.session_id,
            response,
            events: records,
        })
    }

    /// Resolve the session and submit the message in streaming mode. The
    /// caller frames the returned events; `lifecycle` stays with that stream.
    pub async fn open_stream(
        &self,
        mut lifecycle: RequestLifecycle,
        user_id: &str,
        session_id: Option<String>,
        message: Content,
    ) -> Result<(SessionKey, EventStream, RequestLifecycle), RelayError> {
        let key = self.resolve_session(&mut lifecycle, user_id, session_id).await?;
        let events = self.submit(&key, message, StreamingMode::Sse);
        lifecycle.advance(Stage::Submitted);
        Ok((key, events, lifecycle))
    }

    /// Resolve the session, submit the message and return the SSE body.
    /// Session failures surface here; runner failures truncate the body.
    pub async fn run_streaming(
        &self,
        request_id: &str,
        user_id: &str,
        session_id: Option<String>,
        message: Content,
    ) -> Result<impl Stream<Item = Result<Bytes, RelayError>> + Send + 'static, RelayError> {
        let lifecycle = RequestLifecycle::new(request_id, "run_sse");
        let (_key, events, lifecycle) = self.open_stream(lifecycle, user_id, session_id, message).await?;
        Ok(create_sse_stream(events, lifecycle))
    }
}
