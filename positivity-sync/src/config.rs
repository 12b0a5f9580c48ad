//! Configuration for the synchronization layer.

use std::time::Duration;

use positivity_core::RetryConfig;

use crate::query::StalenessPolicy;

/// Configuration for [`SyncClient`](crate::SyncClient).
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Retry policy for queries.
    pub query_retry: RetryConfig,
    /// Retry policy for mutations.
    pub mutation_retry: RetryConfig,
    /// Staleness of every query class.
    pub staleness: StalenessPolicy,
    /// Pause between logout and the second login attempt when the provider
    /// reports a stale session.
    pub relogin_delay: Duration,
    /// Buffer size of the cache event channel.
    pub event_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            query_retry: RetryConfig::default(),
            mutation_retry: RetryConfig::none(),
            staleness: StalenessPolicy::default(),
            relogin_delay: Duration::from_millis(300),
            event_capacity: 64,
        }
    }
}

impl SyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query_retry(mut self, retry: RetryConfig) -> Self {
        self.query_retry = retry;
        self
    }

    pub fn with_mutation_retry(mut self, retry: RetryConfig) -> Self {
        self.mutation_retry = retry;
        self
    }

    pub fn with_staleness(mut self, staleness: StalenessPolicy) -> Self {
        self.staleness = staleness;
        self
    }

    pub fn with_relogin_delay(mut self, delay: Duration) -> Self {
        self.relogin_delay = delay;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}
