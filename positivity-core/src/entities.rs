//! Entities served by the backend

use crate::Principal;
use serde::{Deserialize, Serialize};

/// An inspirational message. The daily message is one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspirationalMessage {
    pub text: String,
    pub author: String,
    pub category: String,
}

impl InspirationalMessage {
    pub fn new(
        text: impl Into<String>,
        author: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            author: author.into(),
            category: category.into(),
        }
    }
}

/// Profile of the calling user. Absent until the caller completes setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
}

impl UserProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Check-in streak of one principal, derived from the backend's counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakInfo {
    pub streak_count: u64,
    pub principal: Principal,
}

impl StreakInfo {
    pub fn new(principal: Principal, streak_count: u64) -> Self {
        Self {
            streak_count,
            principal,
        }
    }

    /// Unit label for the count ("day" or "days").
    pub fn unit(&self) -> &'static str {
        if self.streak_count == 1 {
            "day"
        } else {
            "days"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streak_unit_pluralizes() {
        let principal = Principal::new("p");
        assert_eq!(StreakInfo::new(principal.clone(), 0).unit(), "days");
        assert_eq!(StreakInfo::new(principal.clone(), 1).unit(), "day");
        assert_eq!(StreakInfo::new(principal, 7).unit(), "days");
    }

    #[test]
    fn test_profile_roundtrips_through_json() {
        let profile = UserProfile::new("Ada");
        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value["name"], "Ada");
        let back: UserProfile = serde_json::from_value(value).unwrap();
        assert_eq!(back, profile);
    }
}
