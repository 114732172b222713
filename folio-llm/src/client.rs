use std::sync::Arc;

use openai_dive::v1::resources::chat::{ChatCompletionParameters, ChatCompletionResponse};

use crate::logging::log_llm_error;
use crate::provider::{LlmError, LlmProvider, LlmStream};
use crate::providers::OllamaProvider;

/// Shared handle on a provider; failed requests go through `log_llm_error`
#[derive(Clone)]
pub struct LlmClient {
    provider: Arc<dyn LlmProvider>,
}

impl LlmClient {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    pub fn ollama_from_env() -> Self {
        Self::new(Arc::new(OllamaProvider::from_env()))
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub async fn chat(
        &self,
        request: ChatCompletionParameters,
    ) -> Result<ChatCompletionResponse, LlmError> {
        match self.provider.chat(request.clone()).await {
            Ok(response) => Ok(response),
            Err(e) => {
                log_llm_error(&request, &e, self.provider.name());
                Err(e)
            }
        }
    }

    pub async fn chat_stream(
        &self,
        request: ChatCompletionParameters,
    ) -> Result<LlmStream, LlmError> {
        match self.provider.chat_stream(request.clone()).await {
            Ok(stream) => Ok(stream),
            Err(e) => {
                log_llm_error(&request, &e, self.provider.name());
                Err(e)
            }
        }
    }
}
