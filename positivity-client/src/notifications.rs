//! Toast notifications raised by user actions.

use chrono::{DateTime, Utc};
use positivity_core::{BackendError, SyncError, UserProfile};
use positivity_sync::{CheckInOutcome, MutationOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
    Success,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationAction {
    Retry,
    SignIn,
    Dismiss,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub description: Option<String>,
    pub action: Option<NotificationAction>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(level: NotificationLevel, title: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            description: None,
            action: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_action(mut self, action: NotificationAction) -> Self {
        self.action = Some(action);
        self
    }
}

fn days(count: u64) -> &'static str {
    if count == 1 {
        "day"
    } else {
        "days"
    }
}

fn sign_in_required() -> Notification {
    Notification::new(NotificationLevel::Error, "Please sign in")
        .with_description("You need to be signed in to check in.")
        .with_action(NotificationAction::SignIn)
}

pub fn check_in_succeeded(outcome: &MutationOutcome<u64>) -> Notification {
    let streak = outcome.value;
    match outcome.check_in_outcome() {
        CheckInOutcome::Extended => {
            Notification::new(NotificationLevel::Success, "🎉 Streak extended!").with_description(
                format!("Amazing! You're on a {}-day streak. Keep it going!", streak),
            )
        }
        CheckInOutcome::Unchanged => Notification::new(NotificationLevel::Success, "Check-in successful!")
            .with_description(format!("Your streak is {} {}.", streak, days(streak))),
    }
}

/// `None` for failures that must stay silent.
pub fn check_in_failed(err: &SyncError) -> Option<Notification> {
    match err {
        SyncError::NotReady { .. } => None,
        SyncError::Unauthorized => Some(sign_in_required()),
        SyncError::Backend(BackendError::Rejected { .. }) => Some(
            Notification::new(NotificationLevel::Info, "Already checked in today")
                .with_description("You've already checked in today. Come back tomorrow!"),
        ),
        other => Some(
            Notification::new(NotificationLevel::Error, "Check-in failed")
                .with_description(other.user_message().unwrap_or_default())
                .with_action(NotificationAction::Retry),
        ),
    }
}

pub fn check_in_needs_sign_in() -> Notification {
    Notification::new(NotificationLevel::Error, "Please sign in first")
        .with_description("You need to be signed in to check in.")
        .with_action(NotificationAction::SignIn)
}

pub fn check_in_needs_mood() -> Notification {
    Notification::new(NotificationLevel::Error, "Select a mood")
        .with_description("Please select how you're feeling today.")
}

pub fn profile_saved(outcome: &MutationOutcome<UserProfile>) -> Notification {
    if outcome.is_first_setup() {
        Notification::new(NotificationLevel::Success, "Welcome!")
            .with_description("Your profile has been set up.")
    } else {
        Notification::new(NotificationLevel::Success, "Profile updated")
            .with_description(format!("Hello again, {}.", outcome.value.name))
    }
}

pub fn profile_name_missing() -> Notification {
    Notification::new(NotificationLevel::Error, "Please enter your name")
}

pub fn profile_save_failed(err: &SyncError) -> Option<Notification> {
    match err {
        SyncError::NotReady { .. } => None,
        SyncError::Validation(_) => Some(profile_name_missing()),
        other => Some(
            Notification::new(NotificationLevel::Error, "Failed to save profile").with_description(
                other
                    .user_message()
                    .unwrap_or_else(|| "Please try again.".to_string()),
            ),
        ),
    }
}

pub fn sign_in_failed(err: &SyncError) -> Option<Notification> {
    err.user_message().map(|message| {
        Notification::new(NotificationLevel::Error, "Sign in failed").with_description(message)
    })
}

pub fn sign_out_failed(err: &SyncError) -> Option<Notification> {
    err.user_message().map(|message| {
        Notification::new(NotificationLevel::Error, "Sign out failed").with_description(message)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use positivity_core::{Prerequisite, ValidationError};

    #[test]
    fn test_extended_check_in_celebrates() {
        let note = check_in_succeeded(&MutationOutcome::new(3, Some(2)));
        assert_eq!(note.title, "🎉 Streak extended!");
        assert!(note.description.unwrap().contains("3-day streak"));
    }

    #[test]
    fn test_unchanged_check_in_uses_singular_day() {
        let note = check_in_succeeded(&MutationOutcome::new(1, Some(1)));
        assert_eq!(note.title, "Check-in successful!");
        assert_eq!(note.description.as_deref(), Some("Your streak is 1 day."));
    }

    #[test]
    fn test_not_ready_is_silent() {
        let err = SyncError::not_ready(Prerequisite::Backend);
        assert!(check_in_failed(&err).is_none());
        assert!(profile_save_failed(&err).is_none());
        assert!(sign_in_failed(&err).is_none());
        assert!(sign_out_failed(&err).is_none());
    }

    #[test]
    fn test_sign_out_failure_has_its_own_title() {
        let err = SyncError::Backend(BackendError::Transport {
            method: "connect".to_string(),
            message: "connection reset".to_string(),
        });
        let note = sign_out_failed(&err).unwrap();
        assert_eq!(note.level, NotificationLevel::Error);
        assert_eq!(note.title, "Sign out failed");
    }

    #[test]
    fn test_rejected_check_in_reads_as_already_checked_in() {
        let err = SyncError::Backend(BackendError::Rejected {
            method: "updateDailyTracker".to_string(),
            message: "already recorded".to_string(),
        });
        let note = check_in_failed(&err).unwrap();
        assert_eq!(note.level, NotificationLevel::Info);
        assert_eq!(note.title, "Already checked in today");
    }

    #[test]
    fn test_transport_failure_offers_retry() {
        let err = SyncError::Backend(BackendError::Transport {
            method: "updateDailyTracker".to_string(),
            message: "reset".to_string(),
        });
        let note = check_in_failed(&err).unwrap();
        assert_eq!(note.action, Some(NotificationAction::Retry));
    }

    #[test]
    fn test_validation_failure_asks_for_name() {
        let err = SyncError::Validation(ValidationError::RequiredFieldMissing {
            field: "name".to_string(),
        });
        assert_eq!(profile_save_failed(&err).unwrap().title, "Please enter your name");
    }
}
