//! Principal-scoped cache keys.
//!
//! Caller-scoped queries can only be keyed through [`CacheKey::scoped`],
//! which requires a [`Principal`]. Entries of two callers therefore never
//! share a slot, and a logout can sweep everything one principal owns.

use positivity_core::Principal;
use std::fmt;

/// Queries whose results are the same for every caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SharedQuery {
    DailyMessage,
    AppMotto,
    AllMessages,
    MessagesByCategory,
}

/// Queries whose results belong to one caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopedQuery {
    CallerProfile,
    Streak,
}

impl SharedQuery {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DailyMessage => "dailyMessage",
            Self::AppMotto => "appMotto",
            Self::AllMessages => "allMessages",
            Self::MessagesByCategory => "messagesByCategory",
        }
    }
}

impl ScopedQuery {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CallerProfile => "currentUserProfile",
            Self::Streak => "streakInfo",
        }
    }
}

/// Key identifying one independently cacheable result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    inner: KeyInner,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyInner {
    Shared {
        query: SharedQuery,
        discriminator: Option<String>,
    },
    Scoped {
        principal: Principal,
        query: ScopedQuery,
    },
}

impl CacheKey {
    /// Key for a caller-independent query, optionally narrowed by a
    /// discriminator such as a category.
    pub fn shared(query: SharedQuery, discriminator: Option<String>) -> Self {
        Self {
            inner: KeyInner::Shared {
                query,
                discriminator,
            },
        }
    }

    /// Key for a query owned by `principal`.
    pub fn scoped(principal: Principal, query: ScopedQuery) -> Self {
        Self {
            inner: KeyInner::Scoped { principal, query },
        }
    }

    /// Logical operation name.
    pub fn name(&self) -> &'static str {
        match &self.inner {
            KeyInner::Shared { query, .. } => query.as_str(),
            KeyInner::Scoped { query, .. } => query.as_str(),
        }
    }

    pub fn principal(&self) -> Option<&Principal> {
        match &self.inner {
            KeyInner::Scoped { principal, .. } => Some(principal),
            KeyInner::Shared { .. } => None,
        }
    }

    pub fn discriminator(&self) -> Option<&str> {
        match &self.inner {
            KeyInner::Shared { discriminator, .. } => discriminator.as_deref(),
            KeyInner::Scoped { .. } => None,
        }
    }

    pub fn is_scoped(&self) -> bool {
        matches!(self.inner, KeyInner::Scoped { .. })
    }

    /// Whether this key is namespaced under `principal`.
    pub fn belongs_to(&self, principal: &Principal) -> bool {
        self.principal() == Some(principal)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            KeyInner::Shared {
                query,
                discriminator: Some(discriminator),
            } => write!(f, "{}/{}", query.as_str(), discriminator),
            KeyInner::Shared { query, .. } => f.write_str(query.as_str()),
            KeyInner::Scoped { principal, query } => {
                write!(f, "{}@{}", query.as_str(), principal)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_scoped_keys_differ_by_principal() {
        let alice = CacheKey::scoped(Principal::new("alice"), ScopedQuery::Streak);
        let bob = CacheKey::scoped(Principal::new("bob"), ScopedQuery::Streak);
        assert_ne!(alice, bob);
        assert!(alice.belongs_to(&Principal::new("alice")));
        assert!(!alice.belongs_to(&Principal::new("bob")));
    }

    #[test]
    fn test_shared_key_has_no_principal() {
        let key = CacheKey::shared(SharedQuery::DailyMessage, None);
        assert!(key.principal().is_none());
        assert!(!key.is_scoped());
        assert!(!key.belongs_to(&Principal::new("alice")));
    }

    #[test]
    fn test_discriminator_separates_categories() {
        let joy = CacheKey::shared(SharedQuery::MessagesByCategory, Some("joy".to_string()));
        let calm = CacheKey::shared(SharedQuery::MessagesByCategory, Some("calm".to_string()));
        let keys: HashSet<_> = [joy.clone(), calm].into_iter().collect();
        assert_eq!(keys.len(), 2);
        assert_eq!(joy.discriminator(), Some("joy"));
    }

    #[test]
    fn test_display_format() {
        assert_eq!(
            CacheKey::shared(SharedQuery::AppMotto, None).to_string(),
            "appMotto"
        );
        assert_eq!(
            CacheKey::shared(SharedQuery::MessagesByCategory, Some("joy".into())).to_string(),
            "messagesByCategory/joy"
        );
        assert_eq!(
            CacheKey::scoped(Principal::new("p-1"), ScopedQuery::CallerProfile).to_string(),
            "currentUserProfile@p-1"
        );
    }
}
