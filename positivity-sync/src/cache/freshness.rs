//! Staleness policies for cached query results.
//!
//! Every query class declares how long its value may be served before the
//! next access triggers a refetch. Reads return [`CacheRead<T>`], which
//! carries when the value was fetched and whether it came from the cache.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// How long a cached value may be served without refetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Staleness {
    /// Never stale within a session (motto, message catalog).
    Never,

    /// Stale once older than `max_age`.
    After {
        /// Maximum age before the next read refetches.
        max_age: Duration,
    },

    /// Stale immediately: every read revalidates.
    #[default]
    Always,
}

impl Staleness {
    pub fn after(max_age: Duration) -> Self {
        if max_age.is_zero() {
            Self::Always
        } else {
            Self::After { max_age }
        }
    }

    /// Whether a value fetched at `fetched_at` is stale at `now`.
    pub fn is_stale(&self, fetched_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self {
            Self::Never => false,
            Self::Always => true,
            Self::After { max_age } => age(fetched_at, now) > *max_age,
        }
    }
}

fn age(fetched_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    now.signed_duration_since(fetched_at)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

/// Result of a cache read, carrying fetch metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheRead<T> {
    value: T,
    fetched_at: DateTime<Utc>,
    was_cache_hit: bool,
}

impl<T> CacheRead<T> {
    /// A value served from the cache.
    pub fn from_cache(value: T, fetched_at: DateTime<Utc>) -> Self {
        Self {
            value,
            fetched_at,
            was_cache_hit: true,
        }
    }

    /// A value that was just fetched from the backend.
    pub fn from_backend(value: T, fetched_at: DateTime<Utc>) -> Self {
        Self {
            value,
            fetched_at,
            was_cache_hit: false,
        }
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Time since the value was fetched.
    pub fn age(&self) -> Duration {
        age(self.fetched_at, Utc::now())
    }

    pub fn was_cache_hit(&self) -> bool {
        self.was_cache_hit
    }

    pub fn map<U, F>(self, f: F) -> CacheRead<U>
    where
        F: FnOnce(T) -> U,
    {
        CacheRead {
            value: f(self.value),
            fetched_at: self.fetched_at,
            was_cache_hit: self.was_cache_hit,
        }
    }
}

impl<T> AsRef<T> for CacheRead<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}
