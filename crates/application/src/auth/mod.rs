//! Session management.
//!
//! This module provides:
//! - The session guard, which owns the token pair and refreshes it
//! - Session events for the view layer (login, refresh, forced logout)
//! - Session status for display

mod events;
mod guard;

pub use events::{LogoutReason, SessionEvent, SessionStatus};
pub use guard::SessionGuard;
