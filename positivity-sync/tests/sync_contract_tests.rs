//! Contract tests for the synchronization layer against mock collaborators.

use std::time::Duration;

use positivity_core::{
    BackendError, IdentityError, Principal, RetryConfig, StreakInfo, SyncError, UserProfile,
};
use positivity_sync::{
    CacheEvent, CheckInOutcome, QueryState, Staleness, StalenessPolicy, SyncClient,
};
use positivity_test_utils::fixtures::{alice, bob};
use positivity_test_utils::{test_config, Harness, Method, MockBackend, MockIdentityProvider};

// ============================================================================
// QUERIES
// ============================================================================

#[tokio::test]
async fn test_concurrent_daily_message_reads_issue_one_call() {
    let harness = Harness::anonymous().await;
    harness
        .backend
        .set_latency(Method::DailyMessage, Duration::from_millis(20));

    let (a, b) = tokio::join!(
        harness.client.daily_message(),
        harness.client.daily_message()
    );

    assert_eq!(harness.backend.calls(Method::DailyMessage), 1);
    assert_eq!(a.data(), b.data());
    assert!(a.is_success());
}

#[tokio::test]
async fn test_motto_is_fetched_once() {
    let harness = Harness::anonymous().await;

    let first = harness.client.app_motto().await;
    harness.backend.set_motto("changed");
    let second = harness.client.app_motto().await;

    assert_eq!(first.data(), second.data());
    assert_eq!(harness.backend.calls(Method::AppMotto), 1);
}

#[tokio::test]
async fn test_daily_message_refetches_after_staleness_window() {
    let config = test_config().with_staleness(StalenessPolicy {
        daily_message: Staleness::after(Duration::from_millis(30)),
        ..StalenessPolicy::default()
    });
    let harness = Harness::new(config);
    harness.client.connect().await.unwrap();

    harness.client.daily_message().await;
    harness.client.daily_message().await;
    assert_eq!(harness.backend.calls(Method::DailyMessage), 1);

    tokio::time::sleep(Duration::from_millis(60)).await;
    harness.client.daily_message().await;
    assert_eq!(harness.backend.calls(Method::DailyMessage), 2);
}

#[tokio::test]
async fn test_empty_category_stays_idle() {
    let harness = Harness::anonymous().await;

    let state = harness.client.messages_by_category("").await;

    assert!(state.is_idle());
    assert_eq!(harness.backend.calls(Method::MessagesByCategory), 0);
}

#[tokio::test]
async fn test_category_filters_messages() {
    let harness = Harness::anonymous().await;

    let joy = harness.client.messages_by_category("joy").await.into_data().unwrap();
    let hope = harness.client.messages_by_category("hope").await.into_data().unwrap();

    assert_eq!(joy.len(), 2);
    assert_eq!(hope.len(), 1);
    assert_eq!(harness.backend.calls(Method::MessagesByCategory), 2);
}

#[tokio::test]
async fn test_queries_stay_idle_before_connection() {
    let harness = Harness::new(test_config());

    assert!(harness.client.daily_message().await.is_idle());
    assert!(harness.client.streak_info().await.is_idle());
    assert_eq!(harness.backend.calls(Method::DailyMessage), 0);
}

#[tokio::test]
async fn test_caller_queries_disabled_without_identity() {
    let harness = Harness::anonymous().await;

    assert!(harness.client.caller_profile().await.is_idle());
    assert!(harness.client.streak_info().await.is_idle());
    assert_eq!(harness.backend.calls(Method::CallerProfile), 0);
    assert_eq!(harness.backend.calls(Method::UserStreak), 0);
}

#[tokio::test]
async fn test_failing_query_is_attempted_exactly_twice() {
    let harness = Harness::anonymous().await;
    harness
        .backend
        .fail(Method::AllMessages, MockBackend::transport_error(Method::AllMessages));

    let state = harness.client.all_messages().await;

    assert!(state.is_error());
    assert_eq!(harness.backend.calls(Method::AllMessages), 2);
    assert!(state.error().unwrap().user_message().is_some());
}

#[tokio::test]
async fn test_query_recovers_after_one_failure() {
    let harness = Harness::anonymous().await;
    harness.backend.fail_times(
        Method::DailyMessage,
        1,
        MockBackend::transport_error(Method::DailyMessage),
    );

    let state = harness.client.daily_message().await;

    assert!(state.is_success());
    assert_eq!(harness.backend.calls(Method::DailyMessage), 2);
}

#[tokio::test]
async fn test_refetch_after_error_reaches_backend_again() {
    let harness = Harness::signed_in(alice()).await;
    harness
        .backend
        .fail_times(Method::UserStreak, 2, MockBackend::transport_error(Method::UserStreak));

    assert!(harness.client.streak_info().await.is_error());
    let state = harness.client.refetch_streak().await;

    assert!(state.is_success());
    assert_eq!(harness.backend.calls(Method::UserStreak), 3);
}

#[tokio::test]
async fn test_errored_query_is_fetched_again_on_next_read() {
    let harness = Harness::anonymous().await;
    harness
        .backend
        .fail(Method::AllMessages, MockBackend::transport_error(Method::AllMessages));
    assert!(harness.client.all_messages().await.is_error());

    harness.backend.clear_failures();
    let state = harness.client.all_messages().await;

    assert_eq!(state.into_data().unwrap().len(), 3);
    assert_eq!(harness.backend.calls(Method::AllMessages), 3);
}

#[tokio::test]
async fn test_read_abandoned_by_caller_still_settles() {
    let harness = Harness::anonymous().await;
    harness
        .backend
        .set_latency(Method::AppMotto, Duration::from_millis(50));
    let key = SyncClient::app_motto_key();

    let abandoned =
        tokio::time::timeout(Duration::from_millis(5), harness.client.app_motto()).await;
    assert!(abandoned.is_err());

    tokio::time::sleep(Duration::from_millis(200)).await;
    let cache = harness.client.cache();
    assert!(!cache.is_fetching(&key));
    assert!(cache.snapshot::<String>(&key).is_success());
}

// ============================================================================
// CHECK-IN
// ============================================================================

#[tokio::test]
async fn test_check_in_extends_streak() {
    let harness = Harness::signed_in(alice()).await;
    harness.backend.set_streak(&alice(), 2);
    harness.backend.advance_day();

    let before = harness.client.streak_info().await.into_data().unwrap();
    assert_eq!(before.streak_count, 2);

    let outcome = harness.client.check_in().await.unwrap();
    assert_eq!(outcome.previous, Some(2));
    assert_eq!(outcome.value, 3);
    assert_eq!(outcome.check_in_outcome(), CheckInOutcome::Extended);

    let after = harness.client.streak_info().await.into_data().unwrap();
    assert_eq!(after.streak_count, 3);
    assert_eq!(harness.backend.calls(Method::UserStreak), 2);
    assert_eq!(harness.backend.streak_of(&alice()), 3);
}

#[tokio::test]
async fn test_second_check_in_same_day_is_unchanged() {
    let harness = Harness::signed_in(alice()).await;
    harness.backend.set_streak(&alice(), 3);

    harness.client.streak_info().await;
    let outcome = harness.client.check_in().await.unwrap();

    assert_eq!(outcome.value, 3);
    assert_eq!(outcome.check_in_outcome(), CheckInOutcome::Unchanged);
}

#[tokio::test]
async fn test_first_check_in_without_cached_streak_is_extended() {
    let harness = Harness::signed_in(alice()).await;

    let outcome = harness.client.check_in().await.unwrap();

    assert_eq!(outcome.previous, None);
    assert_eq!(outcome.value, 1);
    assert_eq!(outcome.check_in_outcome(), CheckInOutcome::Extended);
}

#[tokio::test]
async fn test_check_in_without_identity_is_unauthorized() {
    let harness = Harness::anonymous().await;

    let err = harness.client.check_in().await.unwrap_err();

    assert_eq!(err, SyncError::Unauthorized);
    assert_eq!(err.user_message().unwrap(), "Please sign in");
    assert_eq!(harness.backend.calls(Method::DailyTracker), 0);
}

#[tokio::test]
async fn test_failed_check_in_is_not_retried() {
    let harness = Harness::signed_in(alice()).await;
    harness
        .backend
        .fail(Method::DailyTracker, MockBackend::transport_error(Method::DailyTracker));

    assert!(harness.client.check_in().await.is_err());
    assert_eq!(harness.backend.calls(Method::DailyTracker), 1);
}

#[tokio::test]
async fn test_check_in_publishes_invalidation() {
    let harness = Harness::signed_in(alice()).await;
    harness.client.streak_info().await;
    let mut events = harness.client.cache().subscribe();

    harness.client.check_in().await.unwrap();

    let event = events.recv().await.unwrap();
    assert_eq!(
        event,
        CacheEvent::Invalidated {
            key: SyncClient::streak_key(&alice())
        }
    );
}

#[tokio::test]
async fn test_in_flight_streak_read_is_not_committed_after_check_in() {
    let harness = Harness::signed_in(alice()).await;
    harness.backend.set_streak(&alice(), 4);
    harness.backend.advance_day();
    harness
        .backend
        .set_latency(Method::UserStreak, Duration::from_millis(50));

    let client = harness.client.clone();
    let slow_read = tokio::spawn(async move { client.streak_info().await });
    tokio::time::sleep(Duration::from_millis(10)).await;

    let outcome = harness.client.check_in().await.unwrap();
    assert_eq!(outcome.value, 5);
    slow_read.await.unwrap();

    let key = SyncClient::streak_key(&alice());
    let cached = harness.client.cache().peek::<StreakInfo>(&key);
    assert!(cached.map_or(true, |streak| streak.streak_count != 4));
}

// ============================================================================
// PROFILE
// ============================================================================

#[tokio::test]
async fn test_saved_profile_is_read_back() {
    let harness = Harness::signed_in(alice()).await;

    let before = harness.client.caller_profile().await.into_data().unwrap();
    assert_eq!(before, None);

    let outcome = harness
        .client
        .save_profile(UserProfile::new("  Ada  "))
        .await
        .unwrap();
    assert!(outcome.is_first_setup());
    assert_eq!(outcome.value.name, "Ada");

    let after = harness.client.caller_profile().await.into_data().unwrap();
    assert_eq!(after, Some(UserProfile::new("Ada")));
    assert_eq!(harness.backend.calls(Method::CallerProfile), 2);
}

#[tokio::test]
async fn test_profile_update_reports_previous_value() {
    let harness = Harness::signed_in(alice()).await;
    harness
        .backend
        .set_profile(&alice(), UserProfile::new("Ada"));
    harness.client.caller_profile().await;

    let outcome = harness
        .client
        .save_profile(UserProfile::new("Grace"))
        .await
        .unwrap();

    assert!(!outcome.is_first_setup());
    assert_eq!(outcome.previous, Some(UserProfile::new("Ada")));
    assert_eq!(harness.backend.profile_of(&alice()), Some(UserProfile::new("Grace")));
}

#[tokio::test]
async fn test_blank_profile_never_reaches_backend() {
    let harness = Harness::signed_in(alice()).await;

    let err = harness
        .client
        .save_profile(UserProfile::new("   "))
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Validation(_)));
    assert_eq!(harness.backend.calls(Method::SaveProfile), 0);
}

// ============================================================================
// IDENTITY
// ============================================================================

#[tokio::test]
async fn test_identity_switch_never_serves_previous_streak() {
    let provider = MockIdentityProvider::with_principals([alice(), bob()]);
    let harness = Harness::with_provider(test_config(), provider);
    harness.backend.set_streak(&alice(), 10);
    harness.backend.set_streak(&bob(), 1);

    harness.client.sign_in().await.unwrap();
    let alice_streak = harness.client.streak_info().await.into_data().unwrap();
    assert_eq!(alice_streak.streak_count, 10);

    harness.client.sign_out().await.unwrap();
    assert!(harness.client.streak_info().await.is_idle());

    harness.client.sign_in().await.unwrap();
    let bob_streak = harness.client.streak_info().await.into_data().unwrap();
    assert_eq!(bob_streak.principal, bob());
    assert_eq!(bob_streak.streak_count, 1);
}

#[tokio::test]
async fn test_sign_out_keeps_shared_entries() {
    let harness = Harness::signed_in(alice()).await;
    harness.client.app_motto().await;
    harness.client.streak_info().await;

    harness.client.sign_out().await.unwrap();

    let motto_key = SyncClient::app_motto_key();
    let streak_key = SyncClient::streak_key(&alice());
    assert!(harness.client.cache().peek::<String>(&motto_key).is_some());
    assert!(harness
        .client
        .cache()
        .peek::<StreakInfo>(&streak_key)
        .is_none());
}

#[tokio::test]
async fn test_stale_provider_session_is_replaced() {
    let provider = MockIdentityProvider::with_principals([bob()]);
    provider.hold_session(Principal::new("stale"));
    let harness = Harness::with_provider(test_config(), provider);

    let identity = harness.client.sign_in().await.unwrap();

    assert_eq!(identity.principal, bob());
    assert_eq!(harness.provider.logins(), 2);
    assert_eq!(harness.provider.logouts(), 1);
    assert!(harness.client.session().is_ready());
}

#[tokio::test]
async fn test_relogin_sweeps_stale_principal() {
    let harness = Harness::signed_in(alice()).await;
    harness.backend.set_streak(&alice(), 10);
    harness.client.streak_info().await;
    let alice_key = SyncClient::streak_key(&alice());
    assert!(harness.client.cache().peek::<StreakInfo>(&alice_key).is_some());

    harness.provider.queue(bob());
    let identity = harness.client.sign_in().await.unwrap();

    assert_eq!(identity.principal, bob());
    assert_eq!(harness.provider.logouts(), 1);
    assert!(harness.client.cache().peek::<StreakInfo>(&alice_key).is_none());
}

#[tokio::test]
async fn test_in_flight_streak_read_is_not_committed_after_sign_out() {
    let harness = Harness::signed_in(alice()).await;
    harness.backend.set_streak(&alice(), 7);
    harness
        .backend
        .set_latency(Method::UserStreak, Duration::from_millis(50));

    let client = harness.client.clone();
    let slow_read = tokio::spawn(async move { client.streak_info().await });
    tokio::time::sleep(Duration::from_millis(10)).await;

    harness.client.sign_out().await.unwrap();
    slow_read.await.unwrap();

    let key = SyncClient::streak_key(&alice());
    assert!(harness.client.cache().peek::<StreakInfo>(&key).is_none());
    assert!(harness.client.cache().snapshot::<StreakInfo>(&key).is_idle());
}

#[tokio::test]
async fn test_failed_connection_leaves_backend_not_ready() {
    let harness = Harness::new(test_config());
    harness
        .connector
        .fail_next(BackendError::from_message("connect", "replica unreachable"));

    assert!(harness.client.connect().await.is_err());
    assert!(!harness.client.session().is_ready());
    assert!(harness.client.app_motto().await.is_idle());

    harness.client.connect().await.unwrap();
    assert!(harness.client.app_motto().await.is_success());
    assert_eq!(harness.connector.connects(), 2);
}

#[tokio::test]
async fn test_failed_login_keeps_anonymous_session() {
    let harness = Harness::anonymous().await;
    harness.provider.fail_next_login(IdentityError::Cancelled);

    let err = harness.client.sign_in().await.unwrap_err();

    assert_eq!(err, SyncError::Identity(IdentityError::Cancelled));
    assert!(harness.client.session().identity().is_none());
    assert!(harness.client.streak_info().await.is_idle());
}

#[tokio::test]
async fn test_backend_not_ready_until_reconnected() {
    let harness = Harness::anonymous().await;
    // Provider identity changes without a reconnect.
    harness.provider.hold_session(alice());
    assert!(!harness.client.session().is_ready());
    assert!(harness.client.daily_message().await.is_idle());

    harness.client.connect().await.unwrap();
    assert!(harness.client.session().is_ready());
}

#[tokio::test]
async fn test_unauthorized_backend_error_maps_to_sign_in() {
    let harness = Harness::signed_in(alice()).await;
    harness.backend.fail(
        Method::SaveProfile,
        BackendError::from_message("saveCallerUserProfile", "Unauthorized: only users can save"),
    );

    let err = harness
        .client
        .save_profile(UserProfile::new("Ada"))
        .await
        .unwrap_err();

    assert_eq!(err, SyncError::Unauthorized);
}

#[tokio::test]
async fn test_mutation_retry_is_configurable() {
    let config = test_config().with_mutation_retry(RetryConfig::immediate(3));
    let provider = MockIdentityProvider::with_principals([alice()]);
    let harness = Harness::with_provider(config, provider);
    harness.client.sign_in().await.unwrap();
    harness.backend.fail_times(
        Method::DailyTracker,
        2,
        MockBackend::transport_error(Method::DailyTracker),
    );

    let outcome = harness.client.check_in().await.unwrap();

    assert_eq!(outcome.value, 1);
    assert_eq!(harness.backend.calls(Method::DailyTracker), 3);
}

#[tokio::test]
async fn test_snapshot_reports_loading_then_success() {
    let harness = Harness::anonymous().await;
    harness
        .backend
        .set_latency(Method::AppMotto, Duration::from_millis(40));
    let key = SyncClient::app_motto_key();

    let client = harness.client.clone();
    let read = tokio::spawn(async move { client.app_motto().await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(matches!(
        harness.client.cache().snapshot::<String>(&key),
        QueryState::Loading
    ));

    read.await.unwrap();
    assert!(harness.client.cache().snapshot::<String>(&key).is_success());
}
