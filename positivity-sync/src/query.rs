//! Query states and the query catalog.

use std::time::Duration;

use positivity_core::{ErrorClass, SyncError, SyncResult};

use crate::cache::{CacheRead, Staleness};

/// Observable state of a query.
///
/// `Idle` covers both "never ran" and "disabled": a query whose
/// prerequisites are missing stays here and never reports an error.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
    Idle,
    Loading,
    Error(SyncError),
    Success(CacheRead<T>),
}

impl<T> QueryState<T> {
    /// Fold a settled fetch into a state, keeping not-ready failures silent.
    pub fn from_result(result: SyncResult<CacheRead<T>>) -> Self {
        match result {
            Ok(read) => Self::Success(read),
            Err(err) if err.class() == ErrorClass::NotReady => Self::Idle,
            Err(err) => Self::Error(err),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Success(read) => Some(read.value()),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&SyncError> {
        match self {
            Self::Error(err) => Some(err),
            _ => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            Self::Success(read) => Some(read.into_value()),
            _ => None,
        }
    }

    pub fn map<U, F>(self, f: F) -> QueryState<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Idle => QueryState::Idle,
            Self::Loading => QueryState::Loading,
            Self::Error(err) => QueryState::Error(err),
            Self::Success(read) => QueryState::Success(read.map(f)),
        }
    }
}

/// Staleness policy of every query class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StalenessPolicy {
    pub daily_message: Staleness,
    pub app_motto: Staleness,
    pub message_catalog: Staleness,
    pub caller_profile: Staleness,
    pub streak: Staleness,
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self {
            daily_message: Staleness::after(Duration::from_secs(60 * 60)),
            app_motto: Staleness::Never,
            message_catalog: Staleness::Never,
            caller_profile: Staleness::Always,
            streak: Staleness::Always,
        }
    }
}
