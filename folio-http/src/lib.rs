pub mod apis;
pub mod error;
pub mod http;
pub mod relay;
pub mod streaming;

pub use error::{ApiError, ApiJson, ErrorResponse};
pub use http::{build_router, start_server, ServerConfig, ServerState};
pub use relay::{MessageRelay, RelayError, RunOutcome};
pub use streaming::{create_sse_stream, sse_response, SseFrame};
