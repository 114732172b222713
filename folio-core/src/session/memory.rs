use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;

use super::{Session, SessionError, SessionKey, SessionService};
use crate::event::Event;

/// Process-local session store; contents are lost on restart
#[derive(Default)]
pub struct InMemorySessionService {
    sessions: Mutex<HashMap<SessionKey, Session>>,
}

impl InMemorySessionService {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

#[async_trait]
impl SessionService for InMemorySessionService {
    async fn create_session(&self, key: &SessionKey) -> Result<Session, SessionError> {
        let session = Session::new(key.clone());
        let replaced = self
            .sessions
            .lock()
            .await
            .insert(key.clone(), session.clone())
            .is_some();
        if replaced {
            debug!("[{}] Session re-created, previous history dropped", key.session_id);
        }
        Ok(session)
    }

    async fn get_session(&self, key: &SessionKey) -> Result<Session, SessionError> {
        self.sessions
            .lock()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(key.clone()))
    }

    async fn append_event(&self, key: &SessionKey, event: Event) -> Result<(), SessionError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(key)
            .ok_or_else(|| SessionError::NotFound(key.clone()))?;
        session.last_update_time = Utc::now();
        session.events.push(event);
        Ok(())
    }
}
