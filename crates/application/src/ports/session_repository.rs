//! Session repository port
//!
//! Defines the interface for persisting the session across restarts.

use async_trait::async_trait;
use parking_lot::Mutex;
use portal_domain::Session;

/// Errors that can occur while loading or saving the session.
#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Repository trait for session persistence.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Loads the persisted session.
    ///
    /// Returns `None` when nothing has been persisted.
    async fn load(&self) -> Result<Option<Session>, SessionStoreError>;

    /// Persists the session, replacing any previous one.
    ///
    /// # Errors
    /// Returns an error if the session cannot be written.
    async fn save(&self, session: &Session) -> Result<(), SessionStoreError>;

    /// Removes the persisted session. Succeeds when nothing is stored.
    ///
    /// # Errors
    /// Returns an error if the stored session cannot be removed.
    async fn clear(&self) -> Result<(), SessionStoreError>;
}

/// Session repository that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemorySessionRepository {
    session: Mutex<Option<Session>>,
}

impl MemorySessionRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository holding `session`, as if persisted earlier.
    #[must_use]
    pub const fn with_session(session: Session) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }

    /// Returns what is currently stored.
    #[must_use]
    pub fn stored(&self) -> Option<Session> {
        self.session.lock().clone()
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn load(&self) -> Result<Option<Session>, SessionStoreError> {
        Ok(self.stored())
    }

    async fn save(&self, session: &Session) -> Result<(), SessionStoreError> {
        *self.session.lock() = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionStoreError> {
        *self.session.lock() = None;
        Ok(())
    }
}
