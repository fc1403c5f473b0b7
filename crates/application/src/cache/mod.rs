//! Short-lived read cache.

mod collection;
mod scoped;

pub use collection::{CacheCollection, CollectionName};
pub use scoped::ScopedCache;
