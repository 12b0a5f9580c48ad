//! Application state for the client shell.
//!
//! Actions await the synchronization layer and push notifications; views
//! are computed from cache snapshots without touching the backend.

use std::fmt;
use std::str::FromStr;

use positivity_core::{InspirationalMessage, LoginStatus, StreakInfo, UserProfile};
use positivity_sync::{QueryState, SyncClient};
use tracing::debug;

use crate::notifications::{self, Notification};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mood {
    Great,
    Good,
    Okay,
    Low,
}

impl Mood {
    pub const ALL: [Mood; 4] = [Mood::Great, Mood::Good, Mood::Okay, Mood::Low];

    pub fn id(self) -> &'static str {
        match self {
            Mood::Great => "great",
            Mood::Good => "good",
            Mood::Okay => "okay",
            Mood::Low => "low",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mood::Great => "Great",
            Mood::Good => "Good",
            Mood::Okay => "Okay",
            Mood::Low => "Low",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mood::ALL
            .into_iter()
            .find(|mood| mood.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown mood: {}", s))
    }
}

/// What the streak card shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreakView {
    SignedOut,
    Loading,
    Failed,
    Ready { count: u64, unit: &'static str, encouragement: &'static str },
}

/// Motto and message of the day, with per-item loading flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeroView {
    pub motto: Option<String>,
    pub motto_loading: bool,
    pub daily_message: Option<InspirationalMessage>,
    pub daily_message_loading: bool,
}

/// The sign-in/out button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthButton {
    SignIn,
    SigningIn,
    SignOut,
}

impl AuthButton {
    pub fn is_enabled(self) -> bool {
        !matches!(self, AuthButton::SigningIn)
    }
}

pub struct App {
    pub sync: SyncClient,
    pub selected_mood: Option<Mood>,
    pub notifications: Vec<Notification>,
}

impl App {
    pub fn new(sync: SyncClient) -> Self {
        Self {
            sync,
            selected_mood: None,
            notifications: Vec::new(),
        }
    }

    fn notify(&mut self, notification: Notification) {
        debug!(title = %notification.title, "Notification");
        self.notifications.push(notification);
    }

    fn notify_opt(&mut self, notification: Option<Notification>) {
        if let Some(notification) = notification {
            self.notify(notification);
        }
    }

    pub fn select_mood(&mut self, mood: Mood) {
        self.selected_mood = Some(mood);
    }

    pub fn is_signed_in(&self) -> bool {
        self.sync.session().identity().is_some()
    }

    /// Run every query the screen depends on.
    pub async fn refresh(&self) {
        let client = &self.sync;
        tokio::join!(
            client.app_motto(),
            client.daily_message(),
            client.caller_profile(),
            client.streak_info(),
        );
    }

    pub async fn submit_check_in(&mut self) {
        if !self.is_signed_in() {
            self.notify(notifications::check_in_needs_sign_in());
            return;
        }
        if self.selected_mood.is_none() {
            self.notify(notifications::check_in_needs_mood());
            return;
        }
        match self.sync.check_in().await {
            Ok(outcome) => {
                self.notify(notifications::check_in_succeeded(&outcome));
                self.selected_mood = None;
            }
            Err(err) => self.notify_opt(notifications::check_in_failed(&err)),
        }
    }

    pub async fn submit_profile(&mut self, name: &str) {
        if name.trim().is_empty() {
            self.notify(notifications::profile_name_missing());
            return;
        }
        match self.sync.save_profile(UserProfile::new(name)).await {
            Ok(outcome) => self.notify(notifications::profile_saved(&outcome)),
            Err(err) => self.notify_opt(notifications::profile_save_failed(&err)),
        }
    }

    pub fn auth_button(&self) -> AuthButton {
        match self.sync.session().status() {
            LoginStatus::LoggingIn => AuthButton::SigningIn,
            _ if self.is_signed_in() => AuthButton::SignOut,
            _ => AuthButton::SignIn,
        }
    }

    pub async fn toggle_auth(&mut self) {
        match self.auth_button() {
            AuthButton::SigningIn => {}
            AuthButton::SignOut => {
                if let Err(err) = self.sync.sign_out().await {
                    self.notify_opt(notifications::sign_out_failed(&err));
                }
            }
            AuthButton::SignIn => {
                if let Err(err) = self.sync.sign_in().await {
                    self.notify_opt(notifications::sign_in_failed(&err));
                }
            }
        }
    }

    /// Retry affordance of the streak card.
    pub async fn retry_streak(&self) {
        self.sync.refetch_streak().await;
    }

    pub fn streak_view(&self) -> StreakView {
        let Some(identity) = self.sync.session().identity() else {
            return StreakView::SignedOut;
        };
        let key = SyncClient::streak_key(&identity.principal);
        match self.sync.cache().snapshot::<StreakInfo>(&key) {
            QueryState::Idle | QueryState::Loading => StreakView::Loading,
            QueryState::Error(_) => StreakView::Failed,
            QueryState::Success(read) => {
                let streak = read.into_value();
                let encouragement = if streak.streak_count > 0 {
                    "Keep it going! 🎉"
                } else {
                    "Check in today to start your streak!"
                };
                StreakView::Ready {
                    count: streak.streak_count,
                    unit: streak.unit(),
                    encouragement,
                }
            }
        }
    }

    pub fn hero(&self) -> HeroView {
        let cache = self.sync.cache();
        let motto = cache.snapshot::<String>(&SyncClient::app_motto_key());
        let daily = cache.snapshot::<InspirationalMessage>(&SyncClient::daily_message_key());
        HeroView {
            motto_loading: motto.is_loading(),
            motto: motto.into_data(),
            daily_message_loading: daily.is_loading(),
            daily_message: daily.into_data(),
        }
    }

    /// Signed in, profile fetched, and no profile on record.
    pub fn needs_profile_setup(&self) -> bool {
        let Some(identity) = self.sync.session().identity() else {
            return false;
        };
        let key = SyncClient::caller_profile_key(&identity.principal);
        matches!(
            self.sync.cache().snapshot::<Option<UserProfile>>(&key),
            QueryState::Success(read) if read.value().is_none()
        )
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }
}
