use tracing::{debug, info};

/// Progress of one relayed request, in the order stages are reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Received,
    SessionResolved,
    Submitted,
    StreamingEvents,
    Finalized,
}

/// Tracks a request through its stages and reports, when dropped, whether it
/// reached `Finalized`. A streaming response dropped mid-way (client gone,
/// runner error) is logged here.
pub struct RequestLifecycle {
    request_id: String,
    session_id: Option<String>,
    mode: &'static str,
    stage: Stage,
}

impl RequestLifecycle {
    pub fn new(request_id: impl Into<String>, mode: &'static str) -> Self {
        Self {
            request_id: request_id.into(),
            session_id: None,
            mode,
            stage: Stage::Received,
        }
    }

    pub fn resolved(&mut self, session_id: &str) {
        self.session_id = Some(session_id.to_string());
        self.advance(Stage::SessionResolved);
    }

    pub fn advance(&mut self, stage: Stage) {
        debug_assert!(stage >= self.stage);
        self.stage = stage;
        debug!("[{}] - [{}] {} -> {:?}", self.request_id, self.session(), self.mode, stage);
    }

    #[cfg(test)]
    fn stage(&self) -> Stage {
        self.stage
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    fn session(&self) -> &str {
        self.session_id.as_deref().unwrap_or("-")
    }
}

impl Drop for RequestLifecycle {
    fn drop(&mut self) {
        match self.stage {
            Stage::Finalized => {
                debug!("[{}] - [{}] {} completed", self.request_id, self.session(), self.mode);
            }
            stage => {
                info!(
                    "[{}] - [{}] {} ended at {:?} before completion",
                    self.request_id,
                    self.session(),
                    self.mode,
                    stage
                );
            }
        }
    }
}
