//! Gallery resources

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::EventId;
use crate::error::{DomainError, DomainResult};

/// Backend identifier of a gallery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GalleryId(pub i64);

impl fmt::Display for GalleryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A photo gallery, optionally attached to an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gallery {
    /// Gallery identifier
    pub id: GalleryId,
    /// Gallery title
    pub title: String,
    /// Event the gallery belongs to
    #[serde(default)]
    pub event: Option<EventId>,
    /// Number of uploaded images
    #[serde(default)]
    pub image_count: u32,
    /// Fields not modelled by the client
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Gallery {
    /// Creates an empty gallery not attached to any event.
    #[must_use]
    pub fn new(id: GalleryId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            event: None,
            image_count: 0,
            extra: BTreeMap::new(),
        }
    }
}

/// Filter for the gallery list; cache key of the "galleries" collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GalleryQuery {
    /// Only galleries of this event
    pub event: Option<EventId>,
}

impl GalleryQuery {
    /// Galleries of one event.
    #[must_use]
    pub const fn for_event(event: EventId) -> Self {
        Self { event: Some(event) }
    }
}

/// Body of a gallery create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryDraft {
    /// Gallery title
    pub title: String,
    /// Event the gallery belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<EventId>,
}

impl GalleryDraft {
    /// Creates a draft.
    #[must_use]
    pub fn new(title: impl Into<String>, event: Option<EventId>) -> Self {
        Self {
            title: title.into(),
            event,
        }
    }

    /// Checks the fields the backend would reject.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidDraft`] for an empty title.
    pub fn validate(&self) -> DomainResult<()> {
        if self.title.trim().is_empty() {
            return Err(DomainError::InvalidDraft("title is required".to_string()));
        }
        Ok(())
    }
}
