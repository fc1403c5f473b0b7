//! Authentication adapters.

mod http_auth_backend;

pub use http_auth_backend::{HttpAuthBackend, LOGIN_PATH, REFRESH_PATH};
