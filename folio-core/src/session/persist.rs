use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::{Session, SessionError, SessionKey, SessionService};
use crate::event::Event;

/// Session store backed by one JSON file per session
pub struct FileSessionService {
    folder: PathBuf,
    // serializes read-modify-write cycles on session files
    write_lock: Mutex<()>,
}

impl FileSessionService {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Check if session persistence is enabled via environment variable
    pub fn is_enabled() -> bool {
        std::env::var("FOLIO_SESSION_PERSIST_ENABLE")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(false)
    }

    /// Get the folder path for session storage
    pub fn folder_from_env() -> PathBuf {
        std::env::var("FOLIO_SESSION_PERSIST_FOLDER")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".folio/sessions"))
    }

    fn session_file_path(&self, key: &SessionKey) -> PathBuf {
        self.folder.join(session_file_name(key))
    }

    async fn load(&self, key: &SessionKey) -> Result<Session, SessionError> {
        let file_path = self.session_file_path(key);
        let content = match fs::read_to_string(&file_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Session file does not exist: {}", file_path.display());
                return Err(SessionError::NotFound(key.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    /// Atomic write: write to temp file, then rename
    async fn save(&self, session: &Session) -> Result<(), SessionError> {
        fs::create_dir_all(&self.folder).await?;

        let json = serde_json::to_string_pretty(session)?;
        let file_path = self.session_file_path(&session.key);
        let temp_path = self.folder.join(format!("{}.tmp", Uuid::new_v4()));
        fs::write(&temp_path, json).await?;
        fs::rename(&temp_path, &file_path).await?;

        debug!("Session saved to disk: {}", file_path.display());
        Ok(())
    }
}

// Stays well under the 255-byte file name limit of common filesystems
const MAX_FILE_NAME_LEN: usize = 200;

/// Readable `app__user__session.json` for ordinary ids; keys whose encoded
/// form is too long map to a name-based UUID of that form instead.
fn session_file_name(key: &SessionKey) -> String {
    let encoded = format!(
        "{}__{}__{}",
        encode_component(&key.app_name),
        encode_component(&key.user_id),
        encode_component(&key.session_id)
    );
    if encoded.len() + ".json".len() <= MAX_FILE_NAME_LEN {
        format!("{}.json", encoded)
    } else {
        format!("{}.json", Uuid::new_v5(&Uuid::NAMESPACE_OID, encoded.as_bytes()))
    }
}

/// Keeps `[A-Za-z0-9-]`, percent-encodes every other byte so caller-supplied
/// ids can never escape the session folder or collide after encoding.
fn encode_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

#[async_trait]
impl SessionService for FileSessionService {
    async fn create_session(&self, key: &SessionKey) -> Result<Session, SessionError> {
        let _guard = self.write_lock.lock().await;
        let session = Session::new(key.clone());
        self.save(&session).await?;
        Ok(session)
    }

    async fn get_session(&self, key: &SessionKey) -> Result<Session, SessionError> {
        self.load(key).await
    }

    async fn append_event(&self, key: &SessionKey, event: Event) -> Result<(), SessionError> {
        let _guard = self.write_lock.lock().await;
        let mut session = self.load(key).await?;
        session.last_update_time = Utc::now();
        session.events.push(event);
        self.save(&session).await
    }
}
