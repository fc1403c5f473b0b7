//! File-backed persistence.

mod session_repository;

pub use session_repository::{FileSessionRepository, default_session_path};
