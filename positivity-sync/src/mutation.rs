//! Mutation results and their before/after comparison.

use positivity_core::{UserProfile, ValidationError};

/// Authoritative result of a mutation plus the value captured from the cache
/// before it was issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOutcome<T> {
    pub value: T,
    /// `None` when nothing was cached for the affected key.
    pub previous: Option<T>,
}

impl<T> MutationOutcome<T> {
    pub fn new(value: T, previous: Option<T>) -> Self {
        Self { value, previous }
    }
}

/// How a check-in changed the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckInOutcome {
    /// The streak grew.
    Extended,
    /// The streak stayed the same: already checked in today.
    Unchanged,
}

/// `new > previous` means the check-in extended the streak.
pub fn classify_check_in(previous: u64, new: u64) -> CheckInOutcome {
    if new > previous {
        CheckInOutcome::Extended
    } else {
        CheckInOutcome::Unchanged
    }
}

impl MutationOutcome<u64> {
    /// An uncached previous streak counts as zero.
    pub fn check_in_outcome(&self) -> CheckInOutcome {
        classify_check_in(self.previous.unwrap_or(0), self.value)
    }
}

impl MutationOutcome<UserProfile> {
    /// Whether this save created the profile rather than replacing one.
    pub fn is_first_setup(&self) -> bool {
        self.previous.is_none()
    }
}

/// Trim the profile name and reject an empty one.
pub fn validate_profile(profile: UserProfile) -> Result<UserProfile, ValidationError> {
    let name = profile.name.trim();
    if name.is_empty() {
        return Err(ValidationError::RequiredFieldMissing {
            field: "name".to_string(),
        });
    }
    Ok(UserProfile::new(name))
}
