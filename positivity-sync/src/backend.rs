//! Traits for the external collaborators: backend RPC service, connector
//! and identity provider.
//!
//! The synchronization layer treats all three as black boxes. Method names
//! follow the backend's RPC surface.

use std::sync::Arc;

use async_trait::async_trait;
use positivity_core::{
    BackendError, CallerIdentity, IdentityError, InspirationalMessage, LoginStatus, Principal,
    UserProfile,
};

/// A backend handle bound to one caller identity (or to none).
///
/// Caller-scoped methods fail with [`BackendError::Unauthorized`] when the
/// handle is anonymous.
#[async_trait]
pub trait Backend: Send + Sync {
    /// The message of the day. No identity required.
    async fn get_daily_message(&self) -> Result<InspirationalMessage, BackendError>;

    async fn get_app_motto(&self) -> Result<String, BackendError>;

    async fn get_all_messages(&self) -> Result<Vec<InspirationalMessage>, BackendError>;

    async fn get_message_by_category(
        &self,
        category: &str,
    ) -> Result<Vec<InspirationalMessage>, BackendError>;

    /// `None` means the caller has not completed profile setup.
    async fn get_caller_user_profile(&self) -> Result<Option<UserProfile>, BackendError>;

    /// Idempotent upsert of the caller's profile.
    async fn save_caller_user_profile(&self, profile: &UserProfile) -> Result<(), BackendError>;

    async fn get_user_streak(&self, principal: &Principal) -> Result<u64, BackendError>;

    /// Record today's check-in and return the resulting streak.
    async fn update_daily_tracker(&self) -> Result<u64, BackendError>;
}

/// Builds backend handles for an identity.
#[async_trait]
pub trait BackendConnector: Send + Sync {
    async fn connect(
        &self,
        identity: Option<&CallerIdentity>,
    ) -> Result<Arc<dyn Backend>, BackendError>;
}

/// External identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn login(&self) -> Result<CallerIdentity, IdentityError>;

    async fn logout(&self);

    /// The current identity, if any.
    fn identity(&self) -> Option<CallerIdentity>;

    fn status(&self) -> LoginStatus;
}
