//! Domain error types

use thiserror::Error;

/// Domain-level errors raised while validating portal input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The request path is empty or not rooted at `/`.
    #[error("invalid request path: {0}")]
    InvalidPath(String),

    /// The HTTP method is not supported.
    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// Login credentials are incomplete.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// A resource draft is missing required fields.
    #[error("invalid draft: {0}")]
    InvalidDraft(String),
}

/// Result type alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
