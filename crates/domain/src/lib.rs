//! Portal Domain - Core types
//!
//! This crate defines the domain model for the Portal API client:
//! the authenticated session, the token freshness policy, request and
//! response specifications, and the portal resources (events, galleries).
//! All types here are pure Rust with no I/O dependencies.

pub mod auth;
pub mod error;
pub mod request;
pub mod resource;
pub mod response;

pub use auth::{AccessToken, Credentials, RefreshPolicy, Session, UserProfile, token_preview};
pub use error::{DomainError, DomainResult};
pub use request::{ApiRequest, HttpMethod};
pub use resource::{
    EventDetails, EventDraft, EventId, EventPage, EventQuery, EventStatus, EventSummary, Gallery,
    GalleryDraft, GalleryId, GalleryQuery,
};
pub use response::ApiResponse;
