// llm/providers/ollama.rs
use crate::provider::{LlmError, LlmProvider, LlmStream};
use async_trait::async_trait;
use futures::StreamExt;
use openai_dive::v1::{
    api::Client,
    resources::chat::{ChatCompletionParameters, ChatCompletionResponse},
};

pub const DEFAULT_API_BASE: &str = "http://localhost:11434";

pub struct OllamaProvider {
    client: Client,
    base_url: String,
}

impl OllamaProvider {
    /// `api_base` is the Ollama server root (e.g. `http://localhost:11434`),
    /// the OpenAI-compatible `/v1` suffix is appended here.
    pub fn new(api_base: Option<String>, api_key: Option<String>) -> Self {
        let mut client = Client::new(api_key.unwrap_or("ollama".to_string()));
        let base_url = openai_compatible_url(&api_base.unwrap_or(DEFAULT_API_BASE.to_string()));
        client.set_base_url(&base_url);
        Self { client, base_url }
    }

    /// Create Ollama provider from environment variables
    pub fn from_env() -> Self {
        Self::new(
            std::env::var("OLLAMA_API_BASE").ok(),
            std::env::var("OLLAMA_API_KEY").ok(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn openai_compatible_url(api_base: &str) -> String {
    let trimmed = api_base.trim_end_matches('/');
    if trimmed.ends_with("/v1") {
        trimmed.to_string()
    } else {
        format!("{}/v1", trimmed)
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn chat(
        &self,
        request: ChatCompletionParameters,
    ) -> Result<ChatCompletionResponse, LlmError> {
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| Box::new(e) as LlmError)?;
        Ok(response)
    }

    async fn chat_stream(
        &self,
        mut request: ChatCompletionParameters,
    ) -> Result<LlmStream, LlmError> {
        request.stream = Some(true);
        let stream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(|e| Box::new(e) as LlmError)?;

        let converted_stream = stream.map(|result| result.map_err(|e| Box::new(e) as LlmError));

        Ok(Box::new(Box::pin(converted_stream)))
    }

    fn name(&self) -> &'static str {
        "ollama"
    }

}
