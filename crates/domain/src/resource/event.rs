//! Event resources

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::GalleryId;
use crate::error::{DomainError, DomainResult};

/// Backend identifier of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub i64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Publication state of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Not visible to the public
    #[default]
    Draft,
    /// Visible to the public
    Published,
    /// Called off
    Cancelled,
    /// Past and archived
    Archived,
    /// A state this client does not know about
    #[serde(other)]
    Unknown,
}

impl EventStatus {
    /// Returns the wire name used in query strings.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Cancelled => "cancelled",
            Self::Archived => "archived",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row of the event list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSummary {
    /// Event identifier
    pub id: EventId,
    /// Event title
    pub title: String,
    /// Start time
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    /// Publication state
    #[serde(default)]
    pub status: EventStatus,
    /// Venue name
    #[serde(default)]
    pub venue: Option<String>,
    /// Fields not modelled by the client
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl EventSummary {
    /// Creates a draft-status row with only an id and a title.
    #[must_use]
    pub fn new(id: EventId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            starts_at: None,
            status: EventStatus::Draft,
            venue: None,
            extra: BTreeMap::new(),
        }
    }
}

/// One page of the event list, with the total count across pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EventPage {
    /// Events on this page
    #[serde(alias = "results")]
    pub items: Vec<EventSummary>,
    /// Number of events matching the query
    #[serde(alias = "count", default)]
    pub total: u64,
}

/// Filter and pagination for the event list.
///
/// Used as the cache key of the "events" collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventQuery {
    /// 1-based page number
    pub page: u32,
    /// Rows per page
    pub page_size: u32,
    /// Free-text search
    pub search: Option<String>,
    /// Status filter
    pub status: Option<EventStatus>,
}

impl Default for EventQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
            search: None,
            status: None,
        }
    }
}

impl EventQuery {
    /// Returns the query for `page` with default filters.
    #[must_use]
    pub fn page(page: u32) -> Self {
        Self {
            page: page.max(1),
            ..Self::default()
        }
    }

    /// Sets the free-text search.
    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        let search = search.into();
        self.search = (!search.trim().is_empty()).then_some(search);
        self
    }

    /// Sets the status filter.
    #[must_use]
    pub const fn with_status(mut self, status: EventStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// Full event record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDetails {
    /// Event identifier
    pub id: EventId,
    /// Event title
    pub title: String,
    /// Long description
    #[serde(default)]
    pub description: Option<String>,
    /// Start time
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    /// End time
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    /// Publication state
    #[serde(default)]
    pub status: EventStatus,
    /// Venue name
    #[serde(default)]
    pub venue: Option<String>,
    /// Galleries attached to this event
    #[serde(default, alias = "galleries")]
    pub gallery_ids: Vec<GalleryId>,
    /// Fields not modelled by the client
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl EventDetails {
    /// Creates a draft-status record with only an id and a title.
    #[must_use]
    pub fn new(id: EventId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            starts_at: None,
            ends_at: None,
            status: EventStatus::Draft,
            venue: None,
            gallery_ids: Vec::new(),
            extra: BTreeMap::new(),
        }
    }
}

/// Body of an event create or update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDraft {
    /// Event title
    pub title: String,
    /// Long description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Start time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<DateTime<Utc>>,
    /// End time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<DateTime<Utc>>,
    /// Publication state
    #[serde(default)]
    pub status: EventStatus,
    /// Venue name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
}

impl EventDraft {
    /// Creates a draft event with only a title.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            starts_at: None,
            ends_at: None,
            status: EventStatus::Draft,
            venue: None,
        }
    }

    /// Checks the fields the backend would reject.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidDraft`] for an empty title or an
    /// end time before the start time.
    pub fn validate(&self) -> DomainResult<()> {
        if self.title.trim().is_empty() {
            return Err(DomainError::InvalidDraft("title is required".to_string()));
        }
        if let (Some(starts), Some(ends)) = (self.starts_at, self.ends_at)
            && ends < starts
        {
            return Err(DomainError::InvalidDraft(
                "event cannot end before it starts".to_string(),
            ));
        }
        Ok(())
    }
}
