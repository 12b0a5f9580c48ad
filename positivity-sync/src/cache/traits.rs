//! Cacheable value marker, cache events and statistics.

use serde::{de::DeserializeOwned, Serialize};

use super::key::CacheKey;

/// Marker trait for values that can live in the query cache.
///
/// Values are stored as JSON and decoded on read, so they must serialize
/// in both directions. Blanket-implemented for every qualifying type.
pub trait Cacheable: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> Cacheable for T where T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Change notification published by the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// A fetch committed a new value.
    Updated { key: CacheKey },
    /// An entry was marked stale.
    Invalidated { key: CacheKey },
    /// An entry was removed (principal sweep).
    Removed { key: CacheKey },
    /// The whole cache was cleared.
    Cleared,
}

impl CacheEvent {
    /// The key this event concerns, if it concerns a single key.
    pub fn key(&self) -> Option<&CacheKey> {
        match self {
            Self::Updated { key } | Self::Invalidated { key } | Self::Removed { key } => Some(key),
            Self::Cleared => None,
        }
    }
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads served from a fresh entry.
    pub hits: u64,
    /// Reads that started a backend fetch.
    pub misses: u64,
    /// Reads that joined a fetch already in flight.
    pub deduplicated: u64,
    /// In-flight fetches whose result was discarded.
    pub superseded: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses + self.deduplicated;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
