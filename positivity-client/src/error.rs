//! Error types for the client shell.

use positivity_core::SyncError;

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error("Failed to init subscriber: {0}")]
    Telemetry(String),
}
