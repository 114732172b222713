pub const DEFAULT_MODEL: &str = "llama3.2:latest";

/// Persona the runner drives: identity, system prompt and backing model
#[derive(Debug, Clone)]
pub struct AgentDefinition {
    pub name: String,
    pub description: String,
    pub instruction: String,
    pub model: String,
}

impl AgentDefinition {
    pub fn llama_assistant(model: impl Into<String>) -> Self {
        Self {
            name: "llama_assistant".to_string(),
            description: "A helpful AI assistant powered by Llama 3.2 running locally via Ollama."
                .to_string(),
            instruction: "You are a helpful AI assistant running on Llama 3.2 locally via Ollama.\n\n\
                You provide clear, accurate, and helpful responses to user questions.\n\
                Be concise but thorough in your answers.\n\
                If you don't know something, say so honestly.\n"
                .to_string(),
            model: model.into(),
        }
    }

    /// Model from `FOLIO_MODEL`, falling back to [`DEFAULT_MODEL`]
    pub fn from_env() -> Self {
        let model = std::env::var("FOLIO_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Self::llama_assistant(model)
    }
}
