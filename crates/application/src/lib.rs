//! Portal Application - Authenticated API client core
//!
//! This crate defines the application layer with:
//! - Port traits (transport, auth backend, session repository, clock)
//! - The session guard and its single-flight token refresh
//! - The request pipeline (bearer token, one replay after a 401)
//! - The scoped read cache and the portal use cases built on it

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod ports;
pub mod use_cases;

#[cfg(test)]
mod test_support;

pub use auth::{LogoutReason, SessionEvent, SessionGuard, SessionStatus};
pub use cache::{CacheCollection, CollectionName, ScopedCache};
pub use config::ClientConfig;
pub use error::{ApiError, ApplicationResult, RefreshFailure, SessionError};
pub use pipeline::RequestPipeline;
pub use ports::{AuthBackend, Clock, HttpTransport, SessionRepository};
pub use use_cases::PortalClient;
