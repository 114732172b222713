use axum::http::Uri;
use serde::{Deserialize, Serialize};

use super::A2aError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    pub streaming: bool,
    pub push_notifications: bool,
    pub state_transition_history: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSkill {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// Self-description served at `/.well-known/agent.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    pub name: String,
    pub description: String,
    pub url: String,
    pub version: String,
    pub capabilities: AgentCapabilities,
    pub default_input_modes: Vec<String>,
    pub default_output_modes: Vec<String>,
    pub skills: Vec<AgentSkill>,
}

impl AgentCard {
    /// Fails unless `url` is an absolute http(s) URL
    pub fn new(name: &str, description: &str, url: &str) -> Result<Self, A2aError> {
        let uri: Uri = url
            .parse()
            .map_err(|_| A2aError::InvalidCardUrl(url.to_string()))?;
        let scheme_ok = matches!(uri.scheme_str(), Some("http") | Some("https"));
        if !scheme_ok || uri.authority().is_none() {
            return Err(A2aError::InvalidCardUrl(url.to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            description: description.to_string(),
            url: url.to_string(),
            version: "1.0.0".to_string(),
            capabilities: AgentCapabilities {
                streaming: true,
                push_notifications: false,
                state_transition_history: false,
            },
            default_input_modes: vec!["text/plain".to_string()],
            default_output_modes: vec!["text/plain".to_string()],
            skills: vec![],
        })
    }
}
