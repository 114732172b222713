use folio_core::{Content, Part};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

fn default_user_id() -> String {
    "default_user".to_string()
}

fn default_role() -> String {
    folio_core::USER_ROLE.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessagePart {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    #[serde(default = "default_role")]
    pub role: String,
    pub parts: Vec<MessagePart>,
}

impl Message {
    pub fn into_content(self) -> Content {
        Content::new(
            self.role,
            self.parts.into_iter().map(|p| Part::text(p.text)).collect(),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunRequest {
    #[serde(default = "default_user_id")]
    pub user_id: String,
    #[serde(default)]
    pub session_id: Option<String>,
    pub new_message: Message,
    /// Accepted for client compatibility; `/run` and `/run_sse` fix the mode
    #[serde(default)]
    pub streaming: bool,
}

impl RunRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.new_message.parts.is_empty() {
            return Err(ApiError::Validation(
                "new_message.parts must contain at least one part".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionCreateRequest {
    #[serde(default = "default_user_id")]
    pub user_id: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCreateResponse {
    pub session_id: String,
    pub user_id: String,
    pub app_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub agent: String,
}
