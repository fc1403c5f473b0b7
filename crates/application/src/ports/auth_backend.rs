//! Authentication backend port

use std::fmt;

use async_trait::async_trait;
use portal_domain::{Credentials, UserProfile, token_preview};
use thiserror::Error;

use super::TransportError;

/// Failures of the login and refresh endpoints.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthBackendError {
    /// The endpoint answered with a non-2xx status.
    #[error("rejected with status {status}: {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Error description from the payload, or the raw body
        message: String,
    },

    /// The endpoint could not be reached.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The endpoint answered 2xx with an unusable payload.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Tokens and user metadata issued by a successful login.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginGrant {
    /// New access token
    pub access: String,
    /// New refresh token
    pub refresh: Option<String>,
    /// Logged-in user
    pub user: Option<UserProfile>,
}

impl fmt::Debug for LoginGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginGrant")
            .field("access", &token_preview(&self.access))
            .field("refresh", &self.refresh.as_deref().map(token_preview))
            .field("user", &self.user)
            .finish()
    }
}

/// Tokens issued by a successful refresh.
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshGrant {
    /// New access token
    pub access: String,
    /// Rotated refresh token, when the backend rotates them
    pub refresh: Option<String>,
}

impl RefreshGrant {
    /// A grant that keeps the current refresh token.
    #[must_use]
    pub fn access_only(access: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: None,
        }
    }
}

impl fmt::Debug for RefreshGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshGrant")
            .field("access", &token_preview(&self.access))
            .field("refresh", &self.refresh.as_deref().map(token_preview))
            .finish()
    }
}

/// Port for the backend's token endpoints (`POST /login`, `POST /token/refresh`).
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Exchanges credentials for a token pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses the credentials or cannot
    /// be reached.
    async fn login(&self, credentials: &Credentials) -> Result<LoginGrant, AuthBackendError>;

    /// Mints a new access token from a refresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh token is rejected or the backend
    /// cannot be reached.
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshGrant, AuthBackendError>;
}
