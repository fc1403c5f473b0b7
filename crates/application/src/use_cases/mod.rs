//! Application use cases (business logic orchestration).

mod events;
mod galleries;
mod portal_client;

pub use portal_client::PortalClient;
