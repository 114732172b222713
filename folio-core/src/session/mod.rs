mod memory;
mod persist;

pub use memory::InMemorySessionService;
pub use persist::FileSessionService;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::Event;

/// `(application, user, session)` triple a conversation is stored under
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
}

impl SessionKey {
    pub fn new(
        app_name: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            user_id: user_id.into(),
            session_id: session_id.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub key: SessionKey,
    pub events: Vec<Event>,
    pub created_at: DateTime<Utc>,
    pub last_update_time: DateTime<Utc>,
}

impl Session {
    pub fn new(key: SessionKey) -> Self {
        let now = Utc::now();
        Self {
            key,
            events: Vec::new(),
            created_at: now,
            last_update_time: now,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session not found: {}/{}/{}", .0.app_name, .0.user_id, .0.session_id)]
    NotFound(SessionKey),
    #[error("session store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("session encoding error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Conversation memory keyed by [`SessionKey`].
///
/// `create_session` overwrites an existing session with the same key instead
/// of failing; `get_session` reports a missing session as
/// [`SessionError::NotFound`] so callers can tell it apart from store failures.
#[async_trait]
pub trait SessionService: Send + Sync {
    async fn create_session(&self, key: &SessionKey) -> Result<Session, SessionError>;

    async fn get_session(&self, key: &SessionKey) -> Result<Session, SessionError>;

    async fn append_event(&self, key: &SessionKey, event: Event) -> Result<(), SessionError>;
}

/// Short random id of the form `session-1a2b3c4d`
pub fn generate_session_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("session-{}", &hex[..8])
}
