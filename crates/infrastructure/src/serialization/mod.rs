//! JSON helpers for the session file and backend payloads.
//!
//! The session file is written with stable formatting (2-space indentation,
//! trailing newline) so it stays readable when inspected by hand.

mod json;

pub use json::*;
