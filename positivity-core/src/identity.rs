//! Identity types for callers of the backend

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Opaque, stable identifier of an authenticated caller.
///
/// Supplied by the identity provider. The client never interprets the text;
/// it is only compared and used to namespace cache entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Principal {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

/// Login state reported by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoginStatus {
    #[default]
    Unauthenticated,
    LoggingIn,
    Authenticated,
}

impl LoginStatus {
    pub fn is_logging_in(self) -> bool {
        matches!(self, Self::LoggingIn)
    }

    pub fn is_authenticated(self) -> bool {
        matches!(self, Self::Authenticated)
    }
}

/// An authenticated caller as handed out by the identity provider.
///
/// Created on successful login and dropped on logout. The synchronization
/// layer only ever reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    pub principal: Principal,
    pub authenticated_at: Timestamp,
}

impl CallerIdentity {
    pub fn new(principal: Principal) -> Self {
        Self {
            principal,
            authenticated_at: Utc::now(),
        }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }
}
