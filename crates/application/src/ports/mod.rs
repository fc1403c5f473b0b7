//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the application core and external systems.
//! Each port is a trait that can be implemented by adapters in the infrastructure layer.

mod auth_backend;
mod clock;
mod session_repository;
mod transport;

pub use auth_backend::{AuthBackend, AuthBackendError, LoginGrant, RefreshGrant};
pub use clock::{Clock, ManualClock};
pub use session_repository::{MemorySessionRepository, SessionRepository, SessionStoreError};
pub use transport::{HttpTransport, OutboundRequest, TransportError};
