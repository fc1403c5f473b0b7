//! A single named cache collection.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::ports::Clock;

/// Names of the collections held by the scoped cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionName {
    /// Paged event listings
    Events,
    /// Single events, keyed by id
    EventDetails,
    /// Gallery listings
    Galleries,
}

impl CollectionName {
    /// Every collection, in a fixed order.
    pub const ALL: [Self; 3] = [Self::Events, Self::EventDetails, Self::Galleries];

    /// Returns the collection name as a static string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Events => "events",
            Self::EventDetails => "event-details",
            Self::Galleries => "galleries",
        }
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: DateTime<Utc>,
}

struct Slots<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    /// Bumped by every eviction or write a mutation asks for.
    generation: u64,
}

/// Key/value store whose entries are only served while younger than the TTL.
///
/// Stale entries are evicted when read. Values are cloned out, so keep them
/// cheap to clone or wrap them in an `Arc`.
///
/// A read-through fetch should take [`generation`](Self::generation) before
/// going to the network and store with
/// [`set_if_unchanged`](Self::set_if_unchanged), so a response that raced
/// with a mutation is not cached. Mutations store their result with
/// [`replace`](Self::replace), which outdates such in-flight reads.
pub struct CacheCollection<K, V> {
    name: CollectionName,
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
    slots: Mutex<Slots<K, V>>,
}

impl<K, V> CacheCollection<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Creates an empty collection.
    #[must_use]
    pub fn new(name: CollectionName, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            name,
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            clock,
            slots: Mutex::new(Slots {
                entries: HashMap::new(),
                generation: 0,
            }),
        }
    }

    /// The collection's name.
    #[must_use]
    pub const fn name(&self) -> CollectionName {
        self.name
    }

    /// Returns the value stored under `key` if it is still fresh.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut slots = self.slots.lock();
        let fresh = slots
            .entries
            .get(key)
            .map(|entry| self.is_fresh(entry, now).then(|| entry.value.clone()));

        match fresh {
            Some(Some(value)) => {
                trace!(collection = %self.name, "cache hit");
                Some(value)
            }
            Some(None) => {
                slots.entries.remove(key);
                trace!(collection = %self.name, "cache entry expired");
                None
            }
            None => {
                trace!(collection = %self.name, "cache miss");
                None
            }
        }
    }

    /// Stores `value` under `key`, replacing any previous entry.
    pub fn set(&self, key: K, value: V) {
        let entry = self.entry(value);
        self.slots.lock().entries.insert(key, entry);
    }

    /// Stores the result of a write, discarding reads still in flight.
    pub fn replace(&self, key: K, value: V) {
        let entry = self.entry(value);
        let mut slots = self.slots.lock();
        slots.generation += 1;
        slots.entries.insert(key, entry);
    }

    /// Current eviction generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.slots.lock().generation
    }

    /// Stores `value` unless an eviction happened since `generation` was read.
    ///
    /// Returns whether the value was stored.
    pub fn set_if_unchanged(&self, generation: u64, key: K, value: V) -> bool {
        let entry = self.entry(value);
        let mut slots = self.slots.lock();
        if slots.generation != generation {
            trace!(collection = %self.name, "dropping response that raced with an eviction");
            return false;
        }
        slots.entries.insert(key, entry);
        true
    }

    /// Evicts the entry stored under `key`. Returns whether there was one.
    pub fn remove(&self, key: &K) -> bool {
        let mut slots = self.slots.lock();
        slots.generation += 1;
        slots.entries.remove(key).is_some()
    }

    /// Evicts every entry.
    pub fn invalidate(&self) {
        let mut slots = self.slots.lock();
        let evicted = slots.entries.len();
        slots.entries.clear();
        slots.generation += 1;
        drop(slots);
        debug!(collection = %self.name, evicted, "cache collection invalidated");
    }

    /// Number of fresh entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.slots
            .lock()
            .entries
            .values()
            .filter(|entry| self.is_fresh(entry, now))
            .count()
    }

    /// True when no fresh entry is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, value: V) -> CacheEntry<V> {
        CacheEntry {
            value,
            stored_at: self.clock.now(),
        }
    }

    fn is_fresh(&self, entry: &CacheEntry<V>, now: DateTime<Utc>) -> bool {
        now - entry.stored_at < self.ttl
    }
}

impl<K, V> fmt::Debug for CacheCollection<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheCollection")
            .field("name", &self.name)
            .field("ttl", &self.ttl)
            .field("entries", &self.slots.lock().entries.len())
            .finish_non_exhaustive()
    }
}
