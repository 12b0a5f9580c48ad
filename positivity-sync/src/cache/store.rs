//! Read-through query cache with per-key fetch tickets.
//!
//! Each key maps to at most one committed entry and at most one in-flight
//! fetch. Readers of a key whose entry is stale or missing join the in-flight
//! fetch instead of starting another. Every fetch carries the ticket it was
//! issued with; its result is committed only while that ticket is current.
//! Invalidation, cancellation, principal sweeps and `clear` retire tickets,
//! so responses of superseded fetches are dropped.
//!
//! Fetches run on their own task and settle there, so a key leaves the
//! in-flight set even when every reader has been dropped.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use positivity_core::{BackendError, Principal, SyncError, SyncResult, Timestamp};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::freshness::{CacheRead, Staleness};
use super::key::CacheKey;
use super::traits::{CacheEvent, CacheStats, Cacheable};
use crate::query::QueryState;

type SharedFetch = Shared<BoxFuture<'static, SyncResult<(Value, Timestamp)>>>;

struct CacheEntry {
    value: Value,
    fetched_at: Timestamp,
    staleness: Staleness,
    invalidated: bool,
}

impl CacheEntry {
    fn is_stale(&self, now: Timestamp) -> bool {
        self.invalidated || self.staleness.is_stale(self.fetched_at, now)
    }
}

struct InFlight {
    ticket: u64,
    fetch: SharedFetch,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    in_flight: HashMap<CacheKey, InFlight>,
    errors: HashMap<CacheKey, SyncError>,
    next_ticket: u64,
    stats: CacheStats,
}

impl CacheState {
    fn retire(&mut self, key: &CacheKey) -> bool {
        let retired = self.in_flight.remove(key).is_some();
        if retired {
            self.stats.superseded += 1;
        }
        retired
    }

    fn refresh_count(&mut self) {
        self.stats.entry_count = self.entries.len() as u64;
    }
}

/// Shared query cache. Cloning yields another handle to the same cache.
#[derive(Clone)]
pub struct QueryCache {
    state: Arc<Mutex<CacheState>>,
    events: broadcast::Sender<CacheEvent>,
}

impl QueryCache {
    /// Create a cache whose event channel buffers `event_capacity` events.
    pub fn new(event_capacity: usize) -> Self {
        let (events, _rx) = broadcast::channel(event_capacity.max(1));
        Self {
            state: Arc::new(Mutex::new(CacheState::default())),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event: CacheEvent) {
        match self.events.send(event) {
            Ok(receivers) => debug!(receivers, "Published cache event"),
            Err(_) => debug!("No subscribers for cache event"),
        }
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    /// Read `key`, fetching through `fetch` when the entry is missing or stale.
    ///
    /// `fetch` is only polled if this call starts a new backend fetch. When a
    /// fetch for `key` is already in flight the call joins it instead. A new
    /// fetch is spawned onto the current Tokio runtime.
    pub async fn fetch<T, Fut>(
        &self,
        key: &CacheKey,
        staleness: Staleness,
        fetch: Fut,
    ) -> SyncResult<CacheRead<T>>
    where
        T: Cacheable,
        Fut: Future<Output = SyncResult<T>> + Send + 'static,
    {
        let pending = {
            let mut guard = self.lock();
            let state = &mut *guard;
            let now = Utc::now();

            let fresh = state
                .entries
                .get(key)
                .filter(|entry| !entry.is_stale(now))
                .map(|entry| (entry.value.clone(), entry.fetched_at));
            if let Some((value, fetched_at)) = fresh {
                state.stats.hits += 1;
                debug!(key = %key, "Cache hit");
                return decode(key, value).map(|v| CacheRead::from_cache(v, fetched_at));
            }

            if let Some(in_flight) = state.in_flight.get(key) {
                state.stats.deduplicated += 1;
                debug!(key = %key, ticket = in_flight.ticket, "Joining in-flight fetch");
                in_flight.fetch.clone()
            } else {
                state.next_ticket += 1;
                let ticket = state.next_ticket;
                let shared = self.spawn_fetch(key.clone(), ticket, staleness, fetch);
                state.in_flight.insert(
                    key.clone(),
                    InFlight {
                        ticket,
                        fetch: shared.clone(),
                    },
                );
                state.stats.misses += 1;
                debug!(key = %key, ticket, "Cache miss, fetching");
                shared
            }
        };

        let (value, fetched_at) = pending.await?;
        decode(key, value).map(|v| CacheRead::from_backend(v, fetched_at))
    }

    /// Drive `fetch` on its own task and settle the result under `ticket`.
    ///
    /// Must be called with the state lock held so the in-flight entry exists
    /// before the task can settle.
    fn spawn_fetch<T, Fut>(
        &self,
        key: CacheKey,
        ticket: u64,
        staleness: Staleness,
        fetch: Fut,
    ) -> SharedFetch
    where
        T: Cacheable,
        Fut: Future<Output = SyncResult<T>> + Send + 'static,
    {
        let cache = self.clone();
        let label = key.to_string();
        let task = tokio::spawn(async move {
            let result = match fetch.await {
                Ok(value) => serde_json::to_value(value).map_err(|e| SyncError::Decode {
                    key: key.to_string(),
                    reason: e.to_string(),
                }),
                Err(err) => Err(err),
            };
            let fetched_at = cache.settle(&key, ticket, staleness, &result);
            result.map(|value| (value, fetched_at))
        });
        task.map(move |joined| match joined {
            Ok(result) => result,
            Err(err) => {
                warn!(key = %label, ticket, error = %err, "Fetch task did not complete");
                Err(SyncError::Backend(BackendError::Transport {
                    method: label,
                    message: err.to_string(),
                }))
            }
        })
        .boxed()
        .shared()
    }

    /// Commit a fetch result if its ticket is still current.
    fn settle(
        &self,
        key: &CacheKey,
        ticket: u64,
        staleness: Staleness,
        result: &SyncResult<Value>,
    ) -> Timestamp {
        let now = Utc::now();
        let event = {
            let mut guard = self.lock();
            let state = &mut *guard;
            match state.in_flight.get(key) {
                Some(in_flight) if in_flight.ticket == ticket => {}
                _ => {
                    debug!(key = %key, ticket, "Fetch result not committed");
                    return now;
                }
            }
            state.in_flight.remove(key);
            match result {
                Ok(value) => {
                    state.entries.insert(
                        key.clone(),
                        CacheEntry {
                            value: value.clone(),
                            fetched_at: now,
                            staleness,
                            invalidated: false,
                        },
                    );
                    state.errors.remove(key);
                    state.refresh_count();
                    Some(CacheEvent::Updated { key: key.clone() })
                }
                Err(err) if err.is_not_ready() => None,
                Err(err) => {
                    state.errors.insert(key.clone(), err.clone());
                    None
                }
            }
        };
        if let Some(event) = event {
            self.publish(event);
        }
        now
    }

    /// Current cached value regardless of staleness.
    pub fn peek<T: Cacheable>(&self, key: &CacheKey) -> Option<T> {
        let value = self.lock().entries.get(key)?.value.clone();
        decode(key, value).ok()
    }

    /// Render-time view of `key` without triggering a fetch.
    pub fn snapshot<T: Cacheable>(&self, key: &CacheKey) -> QueryState<T> {
        let state = self.lock();
        let fetching = state.in_flight.contains_key(key);
        let entry = state.entries.get(key);
        if fetching && entry.is_none() {
            return QueryState::Loading;
        }
        if let Some(err) = state.errors.get(key) {
            return QueryState::Error(err.clone());
        }
        match entry {
            Some(entry) => match decode(key, entry.value.clone()) {
                Ok(value) => QueryState::Success(CacheRead::from_cache(value, entry.fetched_at)),
                Err(err) => QueryState::Error(err),
            },
            None => QueryState::Idle,
        }
    }

    pub fn is_fetching(&self, key: &CacheKey) -> bool {
        self.lock().in_flight.contains_key(key)
    }

    /// Mark `key` stale and retire any fetch in flight for it.
    ///
    /// The entry is kept so views can keep showing it until the next read
    /// refetches.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        let touched = {
            let mut state = self.lock();
            let retired = state.retire(key);
            let marked = match state.entries.get_mut(key) {
                Some(entry) => {
                    entry.invalidated = true;
                    true
                }
                None => false,
            };
            retired || marked
        };
        if touched {
            debug!(key = %key, "Invalidated");
            self.publish(CacheEvent::Invalidated { key: key.clone() });
        }
        touched
    }

    /// Retire the fetch in flight for `key` without touching its entry.
    pub fn cancel(&self, key: &CacheKey) -> bool {
        let retired = self.lock().retire(key);
        if retired {
            debug!(key = %key, "Cancelled in-flight fetch");
        }
        retired
    }

    /// Remove every entry, error and in-flight fetch scoped to `principal`.
    ///
    /// Returns the number of committed entries removed.
    pub fn remove_principal(&self, principal: &Principal) -> usize {
        let removed: Vec<CacheKey> = {
            let mut guard = self.lock();
            let state = &mut *guard;
            let in_flight: Vec<CacheKey> = state
                .in_flight
                .keys()
                .filter(|key| key.belongs_to(principal))
                .cloned()
                .collect();
            for key in &in_flight {
                state.retire(key);
            }
            state.errors.retain(|key, _| !key.belongs_to(principal));
            let removed: Vec<CacheKey> = state
                .entries
                .keys()
                .filter(|key| key.belongs_to(principal))
                .cloned()
                .collect();
            for key in &removed {
                state.entries.remove(key);
            }
            state.refresh_count();
            removed
        };
        for key in &removed {
            self.publish(CacheEvent::Removed { key: key.clone() });
        }
        debug!(principal = %principal, removed = removed.len(), "Swept principal from cache");
        removed.len()
    }

    /// Drop everything, retiring all in-flight fetches.
    pub fn clear(&self) {
        {
            let mut guard = self.lock();
            let state = &mut *guard;
            state.stats.superseded += state.in_flight.len() as u64;
            state.in_flight.clear();
            state.entries.clear();
            state.errors.clear();
            state.refresh_count();
        }
        self.publish(CacheEvent::Cleared);
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(64)
    }
}

fn decode<T: Cacheable>(key: &CacheKey, value: Value) -> SyncResult<T> {
    serde_json::from_value(value).map_err(|e| SyncError::Decode {
        key: key.to_string(),
        reason: e.to_string(),
    })
}
