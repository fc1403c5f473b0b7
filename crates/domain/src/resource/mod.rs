//! Portal resources carried through the API client

mod event;
mod gallery;

pub use event::{EventDetails, EventDraft, EventId, EventPage, EventQuery, EventStatus, EventSummary};
pub use gallery::{Gallery, GalleryDraft, GalleryId, GalleryQuery};
