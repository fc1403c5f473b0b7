//! Portal Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports
//! defined in the application layer: the reqwest transport, the
//! token endpoints, the session file and the system clock.

pub mod adapters;
pub mod auth;
pub mod persistence;
pub mod serialization;

pub use adapters::{ReqwestTransport, SystemClock};
pub use auth::HttpAuthBackend;
pub use persistence::{FileSessionRepository, default_session_path};
pub use serialization::{SerializationError, from_json_bytes, to_json_stable_bytes};
