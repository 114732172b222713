pub mod handler;
pub mod types;

pub use handler::{create_session, run_agent, run_agent_sse};
pub use types::{HealthResponse, Message, MessagePart, RunRequest, SessionCreateRequest, SessionCreateResponse};
