//! Application error types

use std::time::Duration;

use portal_domain::DomainError;
use thiserror::Error;

use crate::ports::{AuthBackendError, TransportError};

/// Why a refresh call failed. Every variant is fatal to the session.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RefreshFailure {
    /// The refresh endpoint answered with a non-2xx status.
    #[error("refresh endpoint answered {status}: {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Error payload or status text
        message: String,
    },

    /// The refresh call did not settle in time.
    #[error("refresh timed out after {0:?}")]
    TimedOut(Duration),

    /// The refresh call never reached the backend.
    #[error("refresh network failure: {0}")]
    Network(String),

    /// The backend answered 2xx with an unusable payload.
    #[error("malformed refresh response: {0}")]
    InvalidResponse(String),
}

impl From<AuthBackendError> for RefreshFailure {
    fn from(error: AuthBackendError) -> Self {
        match error {
            AuthBackendError::Rejected { status, message } => Self::Rejected { status, message },
            AuthBackendError::Transport(TransportError::Timeout { timeout_ms }) => {
                Self::TimedOut(Duration::from_millis(timeout_ms))
            }
            AuthBackendError::Transport(e) => Self::Network(e.to_string()),
            AuthBackendError::InvalidResponse(message) => Self::InvalidResponse(message),
        }
    }
}

/// Terminal session states. Each one requires a new login.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// No refresh token is stored, so no new access token can be minted.
    #[error("no refresh token available")]
    MissingRefreshToken,

    /// The refresh call failed.
    #[error("refresh rejected: {0}")]
    RefreshRejected(#[from] RefreshFailure),

    /// The backend rejected the freshly refreshed access token as well.
    #[error("access token rejected after refresh")]
    Unauthorized,

    /// The session was closed while the caller waited for a refresh.
    #[error("session ended while waiting for refresh")]
    LoggedOut,

    /// The refresh task stopped before it could settle.
    #[error("refresh interrupted before it settled")]
    Interrupted,
}

/// Errors surfaced by the request pipeline and the portal operations.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The request or draft failed validation before dispatch.
    #[error("invalid input: {0}")]
    Invalid(#[from] DomainError),

    /// Timeout or connection failure; the session is unaffected.
    #[error("network failure: {0}")]
    Network(#[from] TransportError),

    /// The backend answered with a non-2xx, non-401 status.
    #[error("server responded with status {status}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// The session is gone; the user has to log in again.
    #[error("session expired: {0}")]
    SessionExpired(#[from] SessionError),

    /// The login endpoint refused the credentials.
    #[error("login rejected: {0}")]
    LoginRejected(String),

    /// A 2xx response body did not match the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),

    /// A request body could not be serialized.
    #[error("could not encode request body: {0}")]
    Encode(String),
}

impl ApiError {
    /// True when the caller has to log in again.
    #[must_use]
    pub const fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired(_))
    }

    /// Returns the HTTP status for backend-reported failures.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias for application operations.
pub type ApplicationResult<T> = Result<T, ApiError>;
