pub mod agent;
pub mod event;
pub mod runner;
pub mod session;

pub use agent::{AgentDefinition, DEFAULT_MODEL};
pub use event::{Content, Event, FunctionCall, Part, MODEL_ROLE, USER_ROLE};
pub use runner::{AgentRunner, EventStream, LlmRunner, RunConfig, RunRequest, RunnerError, StreamingMode};
pub use session::{
    generate_session_id, FileSessionService, InMemorySessionService, Session, SessionError,
    SessionKey, SessionService,
};
