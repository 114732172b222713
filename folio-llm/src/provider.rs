use async_trait::async_trait;
use futures::Stream;
use openai_dive::v1::resources::chat::{
    ChatCompletionChunkResponse, ChatCompletionParameters, ChatCompletionResponse,
};

pub type LlmError = Box<dyn std::error::Error + Send + Sync>;

pub type LlmStream =
    Box<dyn Stream<Item = Result<ChatCompletionChunkResponse, LlmError>> + Send + Unpin>;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn chat(
        &self,
        request: ChatCompletionParameters,
    ) -> Result<ChatCompletionResponse, LlmError>;

    async fn chat_stream(
        &self,
        request: ChatCompletionParameters,
    ) -> Result<LlmStream, LlmError>;

    fn name(&self) -> &'static str;
}
