use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const USER_ROLE: &str = "user";
pub const MODEL_ROLE: &str = "model";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

/// One piece of a message: plain text or a tool invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            function_call: None,
        }
    }

    pub fn function_call(name: impl Into<String>, args: serde_json::Value) -> Self {
        Self {
            text: None,
            function_call: Some(FunctionCall {
                name: name.into(),
                args,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn new(role: impl Into<String>, parts: Vec<Part>) -> Self {
        Self {
            role: role.into(),
            parts,
        }
    }

    pub fn model_text(text: impl Into<String>) -> Self {
        Self::new(MODEL_ROLE, vec![Part::text(text)])
    }

    /// Text of the first part, if that part is textual
    pub fn first_text(&self) -> Option<&str> {
        self.parts.first().and_then(|p| p.text.as_deref())
    }

    /// Last non-empty text part
    pub fn last_text(&self) -> Option<&str> {
        self.parts
            .iter()
            .rev()
            .filter_map(|p| p.text.as_deref())
            .find(|t| !t.is_empty())
    }

    /// All text parts joined with newlines
    pub fn joined_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Unit of output from a generation turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub invocation_id: String,
    pub author: Option<String>,
    pub content: Option<Content>,
    #[serde(default)]
    pub partial: bool,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(
        invocation_id: impl Into<String>,
        author: Option<String>,
        content: Option<Content>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            invocation_id: invocation_id.into(),
            author,
            content,
            partial: false,
            timestamp: Utc::now(),
        }
    }

    pub fn into_partial(mut self) -> Self {
        self.partial = true;
        self
    }

    pub fn has_function_calls(&self) -> bool {
        self.content
            .as_ref()
            .is_some_and(|c| c.parts.iter().any(|p| p.function_call.is_some()))
    }

    /// Terminal event of a turn: complete (not a streaming chunk) and not
    /// asking for a tool to run
    pub fn is_final_response(&self) -> bool {
        !self.partial && !self.has_function_calls()
    }
}
