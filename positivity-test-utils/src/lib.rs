//! Positivity Test Utilities
//!
//! Shared test infrastructure for the workspace:
//! - An in-memory backend with call counters, failure injection and latency
//! - A mock connector and identity provider
//! - A [`Harness`] wiring all three into a [`SyncClient`]
//! - Fixtures and proptest generators

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

pub use positivity_core::{
    BackendError, CallerIdentity, IdentityError, InspirationalMessage, LoginStatus, Principal,
    RetryConfig, StreakInfo, SyncError, SyncResult, UserProfile,
};
pub use positivity_sync::{
    Backend, BackendConnector, IdentityProvider, QueryState, StalenessPolicy, SyncClient,
    SyncConfig,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// MOCK BACKEND
// ============================================================================

/// Backend methods, for counting calls and injecting failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    DailyMessage,
    AppMotto,
    AllMessages,
    MessagesByCategory,
    CallerProfile,
    SaveProfile,
    UserStreak,
    DailyTracker,
}

impl Method {
    pub fn name(self) -> &'static str {
        match self {
            Method::DailyMessage => "getDailyMessage",
            Method::AppMotto => "getAppMotto",
            Method::AllMessages => "getAllMessages",
            Method::MessagesByCategory => "getMessageByCategory",
            Method::CallerProfile => "getCallerUserProfile",
            Method::SaveProfile => "saveCallerUserProfile",
            Method::UserStreak => "getUserStreak",
            Method::DailyTracker => "updateDailyTracker",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct StreakRecord {
    count: u64,
    last_day: Option<i64>,
}

struct Failure {
    error: BackendError,
    /// `None` fails forever.
    remaining: Option<u32>,
}

struct World {
    messages: Vec<InspirationalMessage>,
    motto: String,
    profiles: HashMap<Principal, UserProfile>,
    streaks: HashMap<Principal, StreakRecord>,
    day: i64,
    calls: HashMap<Method, u32>,
    failures: HashMap<Method, Failure>,
    latency: HashMap<Method, Duration>,
}

impl World {
    fn take_failure(&mut self, method: Method) -> Option<BackendError> {
        let failure = self.failures.get_mut(&method)?;
        let error = failure.error.clone();
        let exhausted = match failure.remaining.as_mut() {
            None => false,
            Some(remaining) => {
                *remaining = remaining.saturating_sub(1);
                *remaining == 0
            }
        };
        if exhausted {
            self.failures.remove(&method);
        }
        Some(error)
    }
}

/// In-memory backend state shared by every connection the connector hands out.
///
/// Responses are computed when the call arrives and delivered after the
/// configured latency, so a slow response carries the state at call time.
#[derive(Clone)]
pub struct MockBackend {
    world: Arc<Mutex<World>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            world: Arc::new(Mutex::new(World {
                messages: fixtures::messages(),
                motto: fixtures::MOTTO.to_string(),
                profiles: HashMap::new(),
                streaks: HashMap::new(),
                day: 0,
                calls: HashMap::new(),
                failures: HashMap::new(),
                latency: HashMap::new(),
            })),
        }
    }

    /// A connection bound to `caller`, bypassing the connector.
    pub fn connection(&self, caller: Option<Principal>) -> MockConnection {
        MockConnection {
            backend: self.clone(),
            caller,
        }
    }

    pub fn calls(&self, method: Method) -> u32 {
        lock(&self.world).calls.get(&method).copied().unwrap_or(0)
    }

    /// Fail every call to `method` with `error`.
    pub fn fail(&self, method: Method, error: BackendError) {
        lock(&self.world).failures.insert(method, Failure { error, remaining: None });
    }

    /// Fail the next `times` calls to `method`.
    pub fn fail_times(&self, method: Method, times: u32, error: BackendError) {
        if times == 0 {
            return;
        }
        lock(&self.world).failures.insert(
            method,
            Failure {
                error,
                remaining: Some(times),
            },
        );
    }

    /// A transport failure for `method`.
    pub fn transport_error(method: Method) -> BackendError {
        BackendError::Transport {
            method: method.name().to_string(),
            message: "connection reset".to_string(),
        }
    }

    pub fn clear_failures(&self) {
        lock(&self.world).failures.clear();
    }

    pub fn set_latency(&self, method: Method, latency: Duration) {
        lock(&self.world).latency.insert(method, latency);
    }

    pub fn set_motto(&self, motto: impl Into<String>) {
        lock(&self.world).motto = motto.into();
    }

    pub fn set_messages(&self, messages: Vec<InspirationalMessage>) {
        lock(&self.world).messages = messages;
    }

    /// Seed a streak as if the last check-in happened today.
    pub fn set_streak(&self, principal: &Principal, count: u64) {
        let mut world = lock(&self.world);
        let day = world.day;
        world.streaks.insert(
            principal.clone(),
            StreakRecord {
                count,
                last_day: Some(day),
            },
        );
    }

    pub fn streak_of(&self, principal: &Principal) -> u64 {
        lock(&self.world)
            .streaks
            .get(principal)
            .map(|record| record.count)
            .unwrap_or(0)
    }

    pub fn profile_of(&self, principal: &Principal) -> Option<UserProfile> {
        lock(&self.world).profiles.get(principal).cloned()
    }

    pub fn set_profile(&self, principal: &Principal, profile: UserProfile) {
        lock(&self.world).profiles.insert(principal.clone(), profile);
    }

    /// Move the backend clock to the next day.
    pub fn advance_day(&self) {
        lock(&self.world).day += 1;
    }

    async fn respond<T, F>(&self, method: Method, compute: F) -> Result<T, BackendError>
    where
        F: FnOnce(&mut World) -> Result<T, BackendError>,
    {
        let (result, latency) = {
            let mut world = lock(&self.world);
            *world.calls.entry(method).or_insert(0) += 1;
            let latency = world.latency.get(&method).copied().unwrap_or_default();
            let result = match world.take_failure(method) {
                Some(error) => Err(error),
                None => compute(&mut world),
            };
            (result, latency)
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        result
    }
}

/// A backend handle bound to one caller (or to none).
#[derive(Clone)]
pub struct MockConnection {
    backend: MockBackend,
    caller: Option<Principal>,
}

impl MockConnection {
    pub fn caller(&self) -> Option<&Principal> {
        self.caller.as_ref()
    }

    fn require_caller(&self, method: Method) -> Result<Principal, BackendError> {
        self.caller.clone().ok_or_else(|| BackendError::Unauthorized {
            method: method.name().to_string(),
            message: "Unauthorized: please sign in".to_string(),
        })
    }
}

#[async_trait]
impl Backend for MockConnection {
    async fn get_daily_message(&self) -> Result<InspirationalMessage, BackendError> {
        self.backend
            .respond(Method::DailyMessage, |world| {
                if world.messages.is_empty() {
                    return Err(BackendError::Rejected {
                        method: Method::DailyMessage.name().to_string(),
                        message: "no messages available".to_string(),
                    });
                }
                let index = world.day.rem_euclid(world.messages.len() as i64) as usize;
                Ok(world.messages[index].clone())
            })
            .await
    }

    async fn get_app_motto(&self) -> Result<String, BackendError> {
        self.backend
            .respond(Method::AppMotto, |world| Ok(world.motto.clone()))
            .await
    }

    async fn get_all_messages(&self) -> Result<Vec<InspirationalMessage>, BackendError> {
        self.backend
            .respond(Method::AllMessages, |world| Ok(world.messages.clone()))
            .await
    }

    async fn get_message_by_category(
        &self,
        category: &str,
    ) -> Result<Vec<InspirationalMessage>, BackendError> {
        self.backend
            .respond(Method::MessagesByCategory, |world| {
                Ok(world
                    .messages
                    .iter()
                    .filter(|message| message.category == category)
                    .cloned()
                    .collect())
            })
            .await
    }

    async fn get_caller_user_profile(&self) -> Result<Option<UserProfile>, BackendError> {
        let caller = self.require_caller(Method::CallerProfile);
        self.backend
            .respond(Method::CallerProfile, move |world| {
                let caller = caller?;
                Ok(world.profiles.get(&caller).cloned())
            })
            .await
    }

    async fn save_caller_user_profile(&self, profile: &UserProfile) -> Result<(), BackendError> {
        let caller = self.require_caller(Method::SaveProfile);
        let profile = profile.clone();
        self.backend
            .respond(Method::SaveProfile, move |world| {
                let caller = caller?;
                world.profiles.insert(caller, profile);
                Ok(())
            })
            .await
    }

    async fn get_user_streak(&self, principal: &Principal) -> Result<u64, BackendError> {
        let principal = principal.clone();
        self.backend
            .respond(Method::UserStreak, move |world| {
                Ok(world
                    .streaks
                    .get(&principal)
                    .map(|record| record.count)
                    .unwrap_or(0))
            })
            .await
    }

    async fn update_daily_tracker(&self) -> Result<u64, BackendError> {
        let caller = self.caller.clone();
        self.backend
            .respond(Method::DailyTracker, move |world| {
                let caller = caller.ok_or_else(|| BackendError::Unauthorized {
                    method: Method::DailyTracker.name().to_string(),
                    message: "Please sign in to check in".to_string(),
                })?;
                let day = world.day;
                let record = world.streaks.entry(caller).or_default();
                match record.last_day {
                    Some(last) if last == day => {}
                    Some(last) if last == day - 1 => record.count += 1,
                    _ => record.count = 1,
                }
                record.last_day = Some(day);
                Ok(record.count)
            })
            .await
    }
}

/// Hands out [`MockConnection`]s over one shared [`MockBackend`].
pub struct MockConnector {
    backend: MockBackend,
    connects: AtomicU32,
    failure: Mutex<Option<BackendError>>,
}

impl MockConnector {
    pub fn new(backend: MockBackend) -> Self {
        Self {
            backend,
            connects: AtomicU32::new(0),
            failure: Mutex::new(None),
        }
    }

    pub fn connects(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }

    /// Fail the next connection attempt.
    pub fn fail_next(&self, error: BackendError) {
        *lock(&self.failure) = Some(error);
    }
}

#[async_trait]
impl BackendConnector for MockConnector {
    async fn connect(
        &self,
        identity: Option<&CallerIdentity>,
    ) -> Result<Arc<dyn Backend>, BackendError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = lock(&self.failure).take() {
            return Err(error);
        }
        let caller = identity.map(|id| id.principal.clone());
        Ok(Arc::new(self.backend.connection(caller)))
    }
}

// ============================================================================
// MOCK IDENTITY PROVIDER
// ============================================================================

#[derive(Default)]
struct ProviderState {
    queued: VecDeque<Principal>,
    current: Option<CallerIdentity>,
    next_failure: Option<IdentityError>,
}

/// Identity provider that hands out queued principals, or fresh random ones
/// once the queue is empty.
///
/// Logging in while an identity is held fails with
/// [`IdentityError::AlreadyAuthenticated`].
#[derive(Default)]
pub struct MockIdentityProvider {
    state: Mutex<ProviderState>,
    logins: AtomicU32,
    logouts: AtomicU32,
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider whose next logins yield `principals` in order.
    pub fn with_principals(principals: impl IntoIterator<Item = Principal>) -> Self {
        let provider = Self::new();
        lock(&provider.state).queued.extend(principals);
        provider
    }

    /// Queue a principal for a later login.
    pub fn queue(&self, principal: Principal) {
        lock(&self.state).queued.push_back(principal);
    }

    /// Pretend a session for `principal` is already held.
    pub fn hold_session(&self, principal: Principal) {
        lock(&self.state).current = Some(CallerIdentity::new(principal));
    }

    pub fn fail_next_login(&self, error: IdentityError) {
        lock(&self.state).next_failure = Some(error);
    }

    pub fn logins(&self) -> u32 {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn logouts(&self) -> u32 {
        self.logouts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn login(&self) -> Result<CallerIdentity, IdentityError> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        let mut state = lock(&self.state);
        if let Some(error) = state.next_failure.take() {
            return Err(error);
        }
        if state.current.is_some() {
            return Err(IdentityError::AlreadyAuthenticated);
        }
        let principal = state
            .queued
            .pop_front()
            .unwrap_or_else(|| Principal::new(Uuid::now_v7().to_string()));
        let identity = CallerIdentity::new(principal);
        state.current = Some(identity.clone());
        Ok(identity)
    }

    async fn logout(&self) {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        lock(&self.state).current = None;
    }

    fn identity(&self) -> Option<CallerIdentity> {
        lock(&self.state).current.clone()
    }

    fn status(&self) -> LoginStatus {
        if lock(&self.state).current.is_some() {
            LoginStatus::Authenticated
        } else {
            LoginStatus::Unauthenticated
        }
    }
}

// ============================================================================
// HARNESS
// ============================================================================

/// A [`SyncClient`] wired to mock collaborators.
pub struct Harness {
    pub client: SyncClient,
    pub backend: MockBackend,
    pub provider: Arc<MockIdentityProvider>,
    pub connector: Arc<MockConnector>,
}

impl Harness {
    pub fn new(config: SyncConfig) -> Self {
        Self::with_provider(config, MockIdentityProvider::new())
    }

    pub fn with_provider(config: SyncConfig, provider: MockIdentityProvider) -> Self {
        let backend = MockBackend::new();
        let provider = Arc::new(provider);
        let connector = Arc::new(MockConnector::new(backend.clone()));
        let client = SyncClient::new(
            Arc::clone(&provider) as Arc<dyn IdentityProvider>,
            Arc::clone(&connector) as Arc<dyn BackendConnector>,
            config,
        );
        Self {
            client,
            backend,
            provider,
            connector,
        }
    }

    /// Connected anonymously.
    pub async fn anonymous() -> Self {
        let harness = Self::new(test_config());
        harness
            .client
            .connect()
            .await
            .expect("anonymous connection");
        harness
    }

    /// Signed in as `principal` and connected.
    pub async fn signed_in(principal: Principal) -> Self {
        let harness = Self::with_provider(
            test_config(),
            MockIdentityProvider::with_principals([principal]),
        );
        harness.client.sign_in().await.expect("sign in");
        harness
    }
}

/// Default configuration with immediate retries and no relogin pause.
pub fn test_config() -> SyncConfig {
    SyncConfig::default()
        .with_query_retry(RetryConfig::immediate(2))
        .with_relogin_delay(Duration::ZERO)
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Canned data for tests.

    use super::*;

    pub const MOTTO: &str = "Stay Beautifully Positive";

    pub fn messages() -> Vec<InspirationalMessage> {
        vec![
            InspirationalMessage::new(
                "Every day may not be good, but there is something good in every day.",
                "Alice Morse Earle",
                "joy",
            ),
            InspirationalMessage::new(
                "Keep your face always toward the sunshine.",
                "Walt Whitman",
                "hope",
            ),
            InspirationalMessage::new(
                "Happiness is not something ready made. It comes from your own actions.",
                "Dalai Lama",
                "joy",
            ),
        ]
    }

    pub fn alice() -> Principal {
        Principal::new("aaaaa-alice")
    }

    pub fn bob() -> Principal {
        Principal::new("bbbbb-bob")
    }
}

// ============================================================================
// GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for the entity types.

    use super::*;
    use proptest::prelude::*;

    /// Generate a principal from random UUID bytes.
    pub fn arb_principal() -> impl Strategy<Value = Principal> {
        any::<[u8; 16]>().prop_map(|bytes| Principal::new(Uuid::from_bytes(bytes).to_string()))
    }

    /// Generate a profile name with visible characters, possibly padded.
    pub fn arb_profile_name() -> impl Strategy<Value = String> {
        ("[ ]{0,3}", "[A-Za-z][A-Za-z0-9 ]{0,20}[A-Za-z0-9]", "[ ]{0,3}")
            .prop_map(|(lead, name, trail)| format!("{lead}{name}{trail}"))
    }

    /// Generate a name consisting only of whitespace.
    pub fn arb_blank_name() -> impl Strategy<Value = String> {
        "[ \t\n]{0,8}"
    }

    pub fn arb_streak() -> impl Strategy<Value = u64> {
        0u64..=3650
    }

    pub fn arb_category() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("joy".to_string()),
            Just("hope".to_string()),
            Just("courage".to_string()),
            "[a-z]{1,12}",
        ]
    }

    pub fn arb_message() -> impl Strategy<Value = InspirationalMessage> {
        ("[A-Za-z ,.]{1,80}", "[A-Za-z ]{1,30}", arb_category())
            .prop_map(|(text, author, category)| InspirationalMessage::new(text, author, category))
    }
}
