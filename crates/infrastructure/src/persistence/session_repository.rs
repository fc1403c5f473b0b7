//! File-based session repository implementation.
//!
//! The session is stored as a single JSON document, by default in
//! `<data dir>/portal/session.json`. Writes go to a sibling temporary file
//! that is then renamed over the target, so a crash never leaves a torn file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use portal_application::ports::{SessionRepository, SessionStoreError};
use portal_domain::Session;
use tokio::fs;

use crate::serialization::{from_json_bytes, to_json_stable_bytes};

/// Returns `<data dir>/portal/session.json`, if the platform has a data dir.
#[must_use]
pub fn default_session_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("portal").join("session.json"))
}

/// File-based session repository.
///
/// ```json
/// {
///   "access_token": "eyJhbGciOi...",
///   "issued_at": "2026-03-01T09:00:00Z",
///   "refresh_token": "eyJhbGciOi...",
///   "user": { "id": 3, "username": "admin" }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileSessionRepository {
    path: PathBuf,
}

impl FileSessionRepository {
    /// Creates a repository storing the session at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The session file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SessionRepository for FileSessionRepository {
    async fn load(&self) -> Result<Option<Session>, SessionStoreError> {
        let content = match fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let session: Session = from_json_bytes(&content)
            .map_err(|e| SessionStoreError::Serialization(e.to_string()))?;
        Ok((!session.is_empty()).then_some(session))
    }

    async fn save(&self, session: &Session) -> Result<(), SessionStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = to_json_stable_bytes(session)
            .map_err(|e| SessionStoreError::Serialization(e.to_string()))?;

        let temp = self.temp_path();
        fs::write(&temp, &content).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&temp, std::fs::Permissions::from_mode(0o600)).await?;
        }
        fs::rename(&temp, &self.path).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionStoreError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
