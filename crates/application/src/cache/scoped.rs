//! The portal's collections, invalidated together or one by one.

use std::sync::Arc;
use std::time::Duration;

use portal_domain::{EventDetails, EventId, EventPage, EventQuery, Gallery, GalleryQuery};
use tracing::debug;

use super::{CacheCollection, CollectionName};
use crate::ports::Clock;

/// Read cache shared by the portal operations.
///
/// Collections never invalidate each other; callers decide which ones a
/// mutation affects.
#[derive(Debug)]
pub struct ScopedCache {
    events: CacheCollection<EventQuery, EventPage>,
    event_details: CacheCollection<EventId, EventDetails>,
    galleries: CacheCollection<GalleryQuery, Vec<Gallery>>,
}

impl ScopedCache {
    /// Creates an empty cache whose entries live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            events: CacheCollection::new(CollectionName::Events, ttl, clock.clone()),
            event_details: CacheCollection::new(CollectionName::EventDetails, ttl, clock.clone()),
            galleries: CacheCollection::new(CollectionName::Galleries, ttl, clock),
        }
    }

    /// Event listings, keyed by query.
    #[must_use]
    pub const fn events(&self) -> &CacheCollection<EventQuery, EventPage> {
        &self.events
    }

    /// Single events, keyed by id.
    #[must_use]
    pub const fn event_details(&self) -> &CacheCollection<EventId, EventDetails> {
        &self.event_details
    }

    /// Gallery listings, keyed by query.
    #[must_use]
    pub const fn galleries(&self) -> &CacheCollection<GalleryQuery, Vec<Gallery>> {
        &self.galleries
    }

    /// Clears one collection.
    pub fn invalidate(&self, name: CollectionName) {
        match name {
            CollectionName::Events => self.events.invalidate(),
            CollectionName::EventDetails => self.event_details.invalidate(),
            CollectionName::Galleries => self.galleries.invalidate(),
        }
    }

    /// Clears every collection.
    pub fn invalidate_all(&self) {
        for name in CollectionName::ALL {
            self.invalidate(name);
        }
        debug!("cache cleared");
    }

    /// Number of fresh entries in collection `name`.
    #[must_use]
    pub fn len(&self, name: CollectionName) -> usize {
        match name {
            CollectionName::Events => self.events.len(),
            CollectionName::EventDetails => self.event_details.len(),
            CollectionName::Galleries => self.galleries.len(),
        }
    }
}
