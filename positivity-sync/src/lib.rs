//! Positivity Sync - Remote State Synchronization
//!
//! Mediates every read and write between the client and the external
//! backend: principal-scoped cache keys, staleness, bounded retries,
//! in-flight deduplication, optimistic capture for mutations and
//! identity-dependent enablement.

pub mod backend;
pub mod cache;
pub mod client;
pub mod config;
pub mod mutation;
pub mod query;
pub mod retry;
pub mod session;

pub use backend::{Backend, BackendConnector, IdentityProvider};
pub use cache::{
    CacheEvent, CacheKey, CacheRead, CacheStats, Cacheable, QueryCache, ScopedQuery, SharedQuery,
    Staleness,
};
pub use client::SyncClient;
pub use config::SyncConfig;
pub use mutation::{classify_check_in, validate_profile, CheckInOutcome, MutationOutcome};
pub use query::{QueryState, StalenessPolicy};
pub use retry::with_retry;
pub use session::Session;
