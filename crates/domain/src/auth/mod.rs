//! Authentication domain types

mod policy;
mod session;

pub use policy::{DEFAULT_SAFETY_MARGIN, DEFAULT_TOKEN_LIFETIME, RefreshPolicy, jwt_expiry};
pub use session::{AccessToken, Credentials, Session, UserProfile, token_preview};
