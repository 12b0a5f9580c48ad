//! The synchronization layer: named queries and mutations over the backend.

use std::future::Future;
use std::sync::Arc;

use positivity_core::{
    BackendError, CallerIdentity, IdentityError, InspirationalMessage, Principal, StreakInfo,
    SyncError, SyncResult, UserProfile,
};
use tracing::{debug, info, warn};

use crate::backend::{Backend, BackendConnector, IdentityProvider};
use crate::cache::{CacheKey, Cacheable, QueryCache, ScopedQuery, SharedQuery, Staleness};
use crate::config::SyncConfig;
use crate::mutation::{validate_profile, MutationOutcome};
use crate::query::QueryState;
use crate::retry::with_retry;
use crate::session::Session;

/// Entry point for all reads and writes against the backend.
///
/// Cheap to clone; clones share the session and the cache.
#[derive(Clone)]
pub struct SyncClient {
    session: Arc<Session>,
    cache: QueryCache,
    config: Arc<SyncConfig>,
}

impl SyncClient {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        connector: Arc<dyn BackendConnector>,
        config: SyncConfig,
    ) -> Self {
        Self {
            session: Arc::new(Session::new(provider, connector)),
            cache: QueryCache::new(config.event_capacity),
            config: Arc::new(config),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Build the backend connection for the current identity.
    pub async fn connect(&self) -> SyncResult<()> {
        self.session.connect().await
    }

    // ========================================================================
    // KEYS
    // ========================================================================

    pub fn daily_message_key() -> CacheKey {
        CacheKey::shared(SharedQuery::DailyMessage, None)
    }

    pub fn app_motto_key() -> CacheKey {
        CacheKey::shared(SharedQuery::AppMotto, None)
    }

    pub fn all_messages_key() -> CacheKey {
        CacheKey::shared(SharedQuery::AllMessages, None)
    }

    pub fn messages_by_category_key(category: &str) -> CacheKey {
        CacheKey::shared(SharedQuery::MessagesByCategory, Some(category.to_string()))
    }

    pub fn caller_profile_key(principal: &Principal) -> CacheKey {
        CacheKey::scoped(principal.clone(), ScopedQuery::CallerProfile)
    }

    pub fn streak_key(principal: &Principal) -> CacheKey {
        CacheKey::scoped(principal.clone(), ScopedQuery::Streak)
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub async fn daily_message(&self) -> QueryState<InspirationalMessage> {
        let staleness = self.config.staleness.daily_message;
        let key = Self::daily_message_key();
        self.run_shared(key, staleness, "getDailyMessage", |backend| async move {
            backend.get_daily_message().await
        })
        .await
    }

    pub async fn app_motto(&self) -> QueryState<String> {
        let staleness = self.config.staleness.app_motto;
        let key = Self::app_motto_key();
        self.run_shared(key, staleness, "getAppMotto", |backend| async move {
            backend.get_app_motto().await
        })
        .await
    }

    pub async fn all_messages(&self) -> QueryState<Vec<InspirationalMessage>> {
        let staleness = self.config.staleness.message_catalog;
        let key = Self::all_messages_key();
        self.run_shared(key, staleness, "getAllMessages", |backend| async move {
            backend.get_all_messages().await
        })
        .await
    }

    /// Disabled (stays idle) for an empty category.
    pub async fn messages_by_category(&self, category: &str) -> QueryState<Vec<InspirationalMessage>> {
        if category.is_empty() {
            return QueryState::Idle;
        }
        let staleness = self.config.staleness.message_catalog;
        let key = Self::messages_by_category_key(category);
        let category = category.to_string();
        self.run_shared(key, staleness, "getMessageByCategory", move |backend| {
            let category = category.clone();
            async move { backend.get_message_by_category(&category).await }
        })
        .await
    }

    /// The caller's profile; `Success(None)` means setup is still needed.
    pub async fn caller_profile(&self) -> QueryState<Option<UserProfile>> {
        let (backend, identity) = match self.session.caller() {
            Ok(caller) => caller,
            Err(err) => return QueryState::from_result(Err(err)),
        };
        let key = Self::caller_profile_key(&identity.principal);
        let staleness = self.config.staleness.caller_profile;
        self.run(key, staleness, "getCallerUserProfile", backend, |backend| async move {
            backend.get_caller_user_profile().await
        })
        .await
    }

    pub async fn streak_info(&self) -> QueryState<StreakInfo> {
        let (backend, identity) = match self.session.caller() {
            Ok(caller) => caller,
            Err(err) => return QueryState::from_result(Err(err)),
        };
        let key = Self::streak_key(&identity.principal);
        let staleness = self.config.staleness.streak;
        let principal = identity.principal;
        self.run(key, staleness, "getUserStreak", backend, move |backend| {
            let principal = principal.clone();
            async move {
                let count = backend.get_user_streak(&principal).await?;
                Ok::<_, BackendError>(StreakInfo::new(principal, count))
            }
        })
        .await
    }

    /// Retry affordance for the streak card: invalidate and read again.
    pub async fn refetch_streak(&self) -> QueryState<StreakInfo> {
        if let Some(identity) = self.session.identity() {
            self.cache.invalidate(&Self::streak_key(&identity.principal));
        }
        self.streak_info().await
    }

    /// Retry affordance for the daily message.
    pub async fn refetch_daily_message(&self) -> QueryState<InspirationalMessage> {
        self.cache.invalidate(&Self::daily_message_key());
        self.daily_message().await
    }

    async fn run_shared<T, F, Fut>(
        &self,
        key: CacheKey,
        staleness: Staleness,
        operation: &'static str,
        call: F,
    ) -> QueryState<T>
    where
        T: Cacheable,
        F: Fn(Arc<dyn Backend>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, BackendError>> + Send + 'static,
    {
        match self.session.backend() {
            Ok(backend) => self.run(key, staleness, operation, backend, call).await,
            Err(err) => QueryState::from_result(Err(err)),
        }
    }

    async fn run<T, F, Fut>(
        &self,
        key: CacheKey,
        staleness: Staleness,
        operation: &'static str,
        backend: Arc<dyn Backend>,
        call: F,
    ) -> QueryState<T>
    where
        T: Cacheable,
        F: Fn(Arc<dyn Backend>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, BackendError>> + Send + 'static,
    {
        let retry = self.config.query_retry.clone();
        let fetch = async move {
            with_retry(&retry, operation, || {
                let pending = call(Arc::clone(&backend));
                async move { pending.await.map_err(SyncError::from) }
            })
            .await
        };
        let result = self.cache.fetch(&key, staleness, fetch).await;
        if let Err(err) = &result {
            if !err.is_not_ready() {
                warn!(key = %key, error = %err, "Query settled with error");
            }
        }
        QueryState::from_result(result)
    }

    // ========================================================================
    // MUTATIONS
    // ========================================================================

    /// Record today's check-in.
    ///
    /// The cached streak is captured before the call and returned as
    /// `previous`; on success the streak entry is invalidated.
    pub async fn check_in(&self) -> SyncResult<MutationOutcome<u64>> {
        let identity = self.session.identity().ok_or(SyncError::Unauthorized)?;
        let backend = self.session.backend()?;
        let key = Self::streak_key(&identity.principal);

        self.cache.cancel(&key);
        let previous = self.cache.peek::<StreakInfo>(&key).map(|s| s.streak_count);

        let result = with_retry(&self.config.mutation_retry, "updateDailyTracker", || {
            let backend = Arc::clone(&backend);
            async move { backend.update_daily_tracker().await.map_err(SyncError::from) }
        })
        .await;

        match result {
            Ok(streak) => {
                self.cache.invalidate(&key);
                info!(principal = %identity.principal, previous, streak, "Checked in");
                Ok(MutationOutcome::new(streak, previous))
            }
            Err(err) => {
                warn!(principal = %identity.principal, error = %err, "Check-in failed");
                Err(err)
            }
        }
    }

    /// Save the caller's profile. The name is trimmed and must not be empty.
    pub async fn save_profile(&self, profile: UserProfile) -> SyncResult<MutationOutcome<UserProfile>> {
        let profile = validate_profile(profile)?;
        let identity = self.session.identity().ok_or(SyncError::Unauthorized)?;
        let backend = self.session.backend()?;
        let key = Self::caller_profile_key(&identity.principal);

        let previous = self.cache.peek::<Option<UserProfile>>(&key).flatten();

        let result = with_retry(&self.config.mutation_retry, "saveCallerUserProfile", || {
            let backend = Arc::clone(&backend);
            let profile = profile.clone();
            async move {
                backend
                    .save_caller_user_profile(&profile)
                    .await
                    .map_err(SyncError::from)
            }
        })
        .await;

        match result {
            Ok(()) => {
                self.cache.invalidate(&key);
                info!(principal = %identity.principal, "Profile saved");
                Ok(MutationOutcome::new(profile, previous))
            }
            Err(err) => {
                warn!(principal = %identity.principal, error = %err, "Profile save failed");
                Err(err)
            }
        }
    }

    // ========================================================================
    // IDENTITY
    // ========================================================================

    /// Log in and reconnect the backend for the new identity.
    ///
    /// A provider still holding a stale session is logged out and asked
    /// again after the configured delay.
    pub async fn sign_in(&self) -> SyncResult<CallerIdentity> {
        let provider = self.session.provider();
        let identity = match provider.login().await {
            Ok(identity) => identity,
            Err(IdentityError::AlreadyAuthenticated) => {
                warn!("Identity provider reports a stale session, logging in again");
                let stale = self.session.identity();
                provider.logout().await;
                self.forget(stale.as_ref());
                if !self.config.relogin_delay.is_zero() {
                    tokio::time::sleep(self.config.relogin_delay).await;
                }
                provider.login().await?
            }
            Err(err) => return Err(err.into()),
        };
        self.session.connect().await?;
        info!(principal = %identity.principal, "Signed in");
        Ok(identity)
    }

    /// Log out, sweep the previous principal's cache entries and reconnect
    /// anonymously.
    pub async fn sign_out(&self) -> SyncResult<()> {
        let previous = self.session.identity();
        self.session.provider().logout().await;
        self.forget(previous.as_ref());
        self.session.connect().await?;
        info!("Signed out");
        Ok(())
    }

    fn forget(&self, identity: Option<&CallerIdentity>) {
        if let Some(identity) = identity {
            let removed = self.cache.remove_principal(&identity.principal);
            debug!(principal = %identity.principal, removed, "Cleared caller cache");
        }
    }
}
