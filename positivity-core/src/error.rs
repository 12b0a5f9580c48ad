//! Error types for remote state synchronization

use thiserror::Error;

/// Failures reported by the backend RPC service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("Unauthorized call to {method}: {message}")]
    Unauthorized { method: String, message: String },

    #[error("Transport failure calling {method}: {message}")]
    Transport { method: String, message: String },

    #[error("Backend rejected {method}: {message}")]
    Rejected { method: String, message: String },
}

impl BackendError {
    /// Classify a backend failure that only arrived as text.
    ///
    /// Rejections mentioning sign-in or authorization become
    /// [`BackendError::Unauthorized`]; anything else is a rejection.
    pub fn from_message(method: impl Into<String>, message: impl Into<String>) -> Self {
        let method = method.into();
        let message = message.into();
        let lowered = message.to_ascii_lowercase();
        if lowered.contains("sign in") || lowered.contains("unauthorized") {
            Self::Unauthorized { method, message }
        } else {
            Self::Rejected { method, message }
        }
    }

    pub fn method(&self) -> &str {
        match self {
            Self::Unauthorized { method, .. }
            | Self::Transport { method, .. }
            | Self::Rejected { method, .. } => method,
        }
    }
}

/// Errors raised by the identity provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("User is already authenticated")]
    AlreadyAuthenticated,

    #[error("Login was cancelled")]
    Cancelled,

    #[error("Login failed: {reason}")]
    LoginFailed { reason: String },
}

/// Input validation errors raised before any backend call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// A resource that must be ready before an operation may run.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq, Hash)]
pub enum Prerequisite {
    #[error("backend connection")]
    Backend,

    #[error("caller identity")]
    Identity,
}

/// How a failure is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// A prerequisite is missing. Silent and never retried.
    NotReady,
    /// The caller must sign in. Rendered as a single message.
    Authorization,
    /// Any other failure. Rendered as an error state with a retry affordance.
    Failure,
}

/// Master error type for the synchronization layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("{prerequisite} not ready")]
    NotReady { prerequisite: Prerequisite },

    #[error("Please sign in")]
    Unauthorized,

    #[error("Backend error: {0}")]
    Backend(BackendError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Cached value for {key} could not be decoded: {reason}")]
    Decode { key: String, reason: String },
}

impl From<BackendError> for SyncError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Unauthorized { .. } => Self::Unauthorized,
            other => Self::Backend(other),
        }
    }
}

impl SyncError {
    pub fn not_ready(prerequisite: Prerequisite) -> Self {
        Self::NotReady { prerequisite }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NotReady { .. } => ErrorClass::NotReady,
            Self::Unauthorized => ErrorClass::Authorization,
            _ => ErrorClass::Failure,
        }
    }

    /// Only transport and backend failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Backend(_))
    }

    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::NotReady { .. })
    }

    /// Text for the user, or `None` when the failure must stay silent.
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::NotReady { .. } => None,
            Self::Unauthorized => Some("Please sign in".to_string()),
            Self::Backend(BackendError::Transport { .. }) => {
                Some("Could not reach the server. Please try again.".to_string())
            }
            Self::Backend(BackendError::Rejected { message, .. }) => Some(message.clone()),
            Self::Backend(BackendError::Unauthorized { .. }) => Some("Please sign in".to_string()),
            Self::Validation(err) => Some(err.to_string()),
            Self::Identity(err) => Some(err.to_string()),
            Self::Decode { .. } => Some("Received an unexpected response.".to_string()),
        }
    }
}

/// Result type alias for synchronization operations.
pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_backend_error_normalizes() {
        let err: SyncError = BackendError::Unauthorized {
            method: "updateDailyTracker".to_string(),
            message: "anonymous caller".to_string(),
        }
        .into();
        assert_eq!(err, SyncError::Unauthorized);
        assert_eq!(err.class(), ErrorClass::Authorization);
        assert!(!err.is_retryable());
        assert_eq!(err.user_message().as_deref(), Some("Please sign in"));
    }

    #[test]
    fn test_from_message_detects_sign_in() {
        let err = BackendError::from_message("updateDailyTracker", "Please sign in to check in");
        assert!(matches!(err, BackendError::Unauthorized { .. }));

        let err = BackendError::from_message("getUserStreak", "Unauthorized: only the user");
        assert!(matches!(err, BackendError::Unauthorized { .. }));

        let err = BackendError::from_message("updateDailyTracker", "already checked in");
        assert!(matches!(err, BackendError::Rejected { .. }));
        assert_eq!(err.method(), "updateDailyTracker");
    }

    #[test]
    fn test_not_ready_is_silent() {
        let err = SyncError::not_ready(Prerequisite::Backend);
        assert_eq!(err.class(), ErrorClass::NotReady);
        assert!(err.is_not_ready());
        assert!(!err.is_retryable());
        assert!(err.user_message().is_none());
        assert_eq!(err.to_string(), "backend connection not ready");
    }

    #[test]
    fn test_transport_failure_is_retryable() {
        let err: SyncError = BackendError::Transport {
            method: "getDailyMessage".to_string(),
            message: "connection reset".to_string(),
        }
        .into();
        assert_eq!(err.class(), ErrorClass::Failure);
        assert!(err.is_retryable());
        assert!(err.user_message().is_some());
    }

    #[test]
    fn test_validation_is_not_retryable() {
        let err: SyncError = ValidationError::RequiredFieldMissing {
            field: "name".to_string(),
        }
        .into();
        assert_eq!(err.class(), ErrorClass::Failure);
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("name"));
    }
}
