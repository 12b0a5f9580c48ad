//! Logging setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ClientConfig;
use crate::error::ClientError;

/// Install the global subscriber. `RUST_LOG` wins over the configured filter,
/// but the configured filter must parse either way.
pub fn init_tracing(config: &ClientConfig) -> Result<(), ClientError> {
    let configured = EnvFilter::try_new(&config.log_filter)
        .map_err(|e| ClientError::Telemetry(format!("invalid log_filter: {}", e)))?;
    let env_filter = EnvFilter::try_from_default_env().unwrap_or(configured);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| ClientError::Telemetry(e.to_string()))?;

    tracing::info!(filter = %config.log_filter, "Logging initialised");
    Ok(())
}
