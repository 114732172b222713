use std::sync::Arc;

use async_stream::try_stream;
use folio_llm::{
    ChatCompletionChunkResponse, ChatCompletionParametersBuilder, ChatCompletionResponse,
    ChatMessage, ChatMessageContent, LlmClient,
};
use futures::{Stream, StreamExt};
use tracing::{debug, info};
use uuid::Uuid;

use super::{AgentRunner, EventStream, RunRequest, RunnerError, StreamingMode};
use crate::agent::AgentDefinition;
use crate::event::{Content, Event, USER_ROLE};
use crate::session::{SessionKey, SessionService};

/// Runner that answers with a single LLM completion per turn
pub struct LlmRunner {
    agent: Arc<AgentDefinition>,
    sessions: Arc<dyn SessionService>,
    llm: LlmClient,
}

impl LlmRunner {
    pub fn new(agent: Arc<AgentDefinition>, sessions: Arc<dyn SessionService>, llm: LlmClient) -> Self {
        Self { agent, sessions, llm }
    }
}

impl AgentRunner for LlmRunner {
    fn app_name(&self) -> &str {
        &self.agent.name
    }

    fn run(&self, request: RunRequest) -> EventStream {
        Box::pin(run_turn(
            self.agent.clone(),
            self.sessions.clone(),
            self.llm.clone(),
            request,
        ))
    }
}

fn run_turn(
    agent: Arc<AgentDefinition>,
    sessions: Arc<dyn SessionService>,
    llm: LlmClient,
    request: RunRequest,
) -> impl Stream<Item = Result<Event, RunnerError>> + Send {
    try_stream! {
        let key = SessionKey::new(agent.name.clone(), request.user_id.clone(), request.session_id.clone());
        let invocation_id = format!("e-{}", Uuid::new_v4());

        let session = sessions.get_session(&key).await?;
        let messages = build_trace(&agent, &session.events, &request.new_message);
        let params = ChatCompletionParametersBuilder::default()
            .model(&agent.model)
            .messages(messages)
            .build()
            .map_err(|e| RunnerError::Llm(e.to_string().into()))?;

        info!("[{}] - [{}] LLM {} ({})", invocation_id, key.session_id, llm.provider_name(), agent.model);

        let text = match request.config.streaming_mode {
            StreamingMode::None => {
                let response = llm.chat(params).await.map_err(RunnerError::Llm)?;
                response_text(&response).ok_or(RunnerError::EmptyResponse)?
            }
            StreamingMode::Sse => {
                let mut chunks = llm.chat_stream(params).await.map_err(RunnerError::Llm)?;
                let mut full = String::new();
                while let Some(chunk) = chunks.next().await {
                    let chunk = chunk.map_err(RunnerError::Llm)?;
                    if let Some(delta) = chunk_text(&chunk).filter(|d| !d.is_empty()) {
                        full.push_str(&delta);
                        yield Event::new(
                            invocation_id.clone(),
                            Some(agent.name.clone()),
                            Some(Content::model_text(delta)),
                        )
                        .into_partial();
                    }
                }
                if full.is_empty() {
                    Err(RunnerError::EmptyResponse)?;
                }
                full
            }
        };

        // the user turn is only recorded together with a reply, so a failed
        // model call leaves the history unchanged
        let user_event = Event::new(
            invocation_id.clone(),
            Some(USER_ROLE.to_string()),
            Some(request.new_message.clone()),
        );
        sessions.append_event(&key, user_event).await?;
        let final_event = Event::new(invocation_id.clone(), Some(agent.name.clone()), Some(Content::model_text(text)));
        sessions.append_event(&key, final_event.clone()).await?;
        debug!("[{}] - [{}] Turn completed", invocation_id, key.session_id);
        yield final_event;
    }
}

/// System instruction, prior complete turns, then the new message
fn build_trace(agent: &AgentDefinition, history: &[Event], new_message: &Content) -> Vec<ChatMessage> {
    let mut trace = vec![ChatMessage::System {
        content: ChatMessageContent::Text(agent.instruction.clone()),
        name: None,
    }];

    for event in history.iter().filter(|e| !e.partial) {
        let Some(content) = &event.content else {
            continue;
        };
        let text = content.joined_text();
        if text.is_empty() {
            continue;
        }
        if content.role == USER_ROLE {
            trace.push(user_message(text));
        } else {
            trace.push(ChatMessage::Assistant {
                content: Some(ChatMessageContent::Text(text)),
                tool_calls: None,
                name: None,
                audio: None,
                reasoning_content: None,
                refusal: None,
            });
        }
    }

    trace.push(user_message(new_message.joined_text()));
    trace
}

fn user_message(text: String) -> ChatMessage {
    ChatMessage::User {
        content: ChatMessageContent::Text(text),
        name: None,
    }
}

fn response_text(response: &ChatCompletionResponse) -> Option<String> {
    response.choices.first().and_then(|choice| match &choice.message {
        ChatMessage::Assistant {
            content: Some(ChatMessageContent::Text(text)),
            ..
        } => Some(text.clone()),
        _ => None,
    })
}

// Read through the wire representation so delta variants don't matter
fn chunk_text(chunk: &ChatCompletionChunkResponse) -> Option<String> {
    let value = serde_json::to_value(chunk).ok()?;
    value["choices"][0]["delta"]["content"]
        .as_str()
        .map(str::to_string)
}
