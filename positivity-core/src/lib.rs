//! Positivity Core - Entity Types
//!
//! Plain data structures shared by every other crate: caller identity,
//! the entities the backend serves, the error taxonomy and retry policy.
//! This crate contains no I/O.

pub mod config;
pub mod entities;
pub mod error;
pub mod identity;

pub use config::RetryConfig;
pub use entities::{InspirationalMessage, StreakInfo, UserProfile};
pub use error::{
    BackendError, ErrorClass, IdentityError, Prerequisite, SyncError, SyncResult, ValidationError,
};
pub use identity::{CallerIdentity, LoginStatus, Principal, Timestamp};

/// The daily message is an inspirational message picked by the backend.
pub type DailyMessage = InspirationalMessage;
