pub mod client;
pub mod logging;
pub mod provider;
pub mod providers;

pub use client::LlmClient;
pub use provider::{LlmError, LlmProvider, LlmStream};
pub use providers::OllamaProvider;

pub use openai_dive::v1::resources::chat::{
    ChatCompletionChunkResponse, ChatCompletionParameters, ChatCompletionParametersBuilder,
    ChatCompletionResponse, ChatMessage, ChatMessageContent,
};
