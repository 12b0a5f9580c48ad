//! Query cache with explicit staleness and principal isolation.
//!
//! Values are keyed by [`CacheKey`]; caller-scoped keys cannot be built
//! without a principal, so one caller's data is never served to another.
//! Each query class declares a [`Staleness`] policy, and reads return
//! [`CacheRead<T>`] carrying fetch metadata.
//!
//! # Example
//!
//! ```ignore
//! let key = CacheKey::shared(SharedQuery::DailyMessage, None);
//! let read = cache
//!     .fetch::<InspirationalMessage, _>(&key, Staleness::after(hour), fetch)
//!     .await?;
//! if read.was_cache_hit() {
//!     tracing::debug!(age = ?read.age(), "served cached message");
//! }
//! ```

pub mod freshness;
pub mod key;
pub mod store;
pub mod traits;

pub use freshness::{CacheRead, Staleness};
pub use key::{CacheKey, ScopedQuery, SharedQuery};
pub use store::QueryCache;
pub use traits::{CacheEvent, CacheStats, Cacheable};
