mod llm;

pub use llm::LlmRunner;

use std::pin::Pin;

use folio_llm::LlmError;
use futures::Stream;

use crate::event::{Content, Event};
use crate::session::SessionError;

pub type EventStream = Pin<Box<dyn Stream<Item = Result<Event, RunnerError>> + Send>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StreamingMode {
    /// One complete event per turn
    #[default]
    None,
    /// Partial text chunks followed by the complete event
    Sse,
}

#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub streaming_mode: StreamingMode,
}

/// One turn submitted to a runner
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub user_id: String,
    pub session_id: String,
    pub new_message: Content,
    pub config: RunConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("llm request failed: {0}")]
    Llm(#[source] LlmError),
    #[error("model returned no text")]
    EmptyResponse,
}

/// Executes a generation turn against an existing session.
///
/// The returned stream is lazy: nothing happens until it is polled, and each
/// poll yields at most one event. The last successful item is the turn's
/// terminal event.
pub trait AgentRunner: Send + Sync {
    /// Application name sessions are registered under
    fn app_name(&self) -> &str;

    fn run(&self, request: RunRequest) -> EventStream;
}
