//! Configuration loading for the client shell.
//!
//! All fields are required unless explicitly marked optional. No defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use positivity_core::RetryConfig;
use positivity_sync::{Staleness, StalenessPolicy, SyncConfig};

pub const CONFIG_ENV_VAR: &str = "POSITIVITY_CONFIG";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub query_retry: RetrySection,
    pub mutation_retry: RetrySection,
    pub staleness: StalenessSection,
    pub relogin_delay_ms: u64,
    pub event_capacity: usize,
    pub log_filter: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySection {
    pub attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub multiplier: f32,
}

/// Staleness windows in seconds. Zero revalidates on every read; an absent
/// optional window never goes stale.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StalenessSection {
    pub daily_message_secs: u64,
    pub streak_secs: u64,
    pub profile_secs: u64,
    pub app_motto_secs: Option<u64>,
    pub catalog_secs: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or POSITIVITY_CONFIG)")]
    MissingConfigPath,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ClientConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path_from_args().or_else(config_path_from_env);
        let path = path.ok_or(ConfigError::MissingConfigPath)?;
        let config = Self::from_path(&path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.query_retry.validate([
            "query_retry.attempts",
            "query_retry.max_backoff_ms",
            "query_retry.multiplier",
        ])?;
        self.mutation_retry.validate([
            "mutation_retry.attempts",
            "mutation_retry.max_backoff_ms",
            "mutation_retry.multiplier",
        ])?;
        if self.event_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "event_capacity",
                reason: "must be > 0".to_string(),
            });
        }
        if self.log_filter.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "log_filter",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn to_sync_config(&self) -> SyncConfig {
        SyncConfig::new()
            .with_query_retry(self.query_retry.to_retry_config())
            .with_mutation_retry(self.mutation_retry.to_retry_config())
            .with_staleness(self.staleness.to_policy())
            .with_relogin_delay(Duration::from_millis(self.relogin_delay_ms))
            .with_event_capacity(self.event_capacity)
    }
}

impl RetrySection {
    /// `fields` names the attempts, max backoff and multiplier keys.
    fn validate(&self, fields: [&'static str; 3]) -> Result<(), ConfigError> {
        let [attempts, max_backoff, multiplier] = fields;
        if self.attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: attempts,
                reason: "must be >= 1".to_string(),
            });
        }
        if self.max_backoff_ms < self.initial_backoff_ms {
            return Err(ConfigError::InvalidValue {
                field: max_backoff,
                reason: "must be >= initial_backoff_ms".to_string(),
            });
        }
        if self.multiplier.is_nan() || self.multiplier < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: multiplier,
                reason: "must be >= 1.0".to_string(),
            });
        }
        Ok(())
    }

    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.attempts,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            backoff_multiplier: self.multiplier,
        }
    }
}

impl StalenessSection {
    pub fn to_policy(&self) -> StalenessPolicy {
        let window = |secs: u64| Staleness::after(Duration::from_secs(secs));
        let optional = |secs: Option<u64>| secs.map_or(Staleness::Never, window);
        StalenessPolicy {
            daily_message: window(self.daily_message_secs),
            app_motto: optional(self.app_motto_secs),
            message_catalog: optional(self.catalog_secs),
            caller_profile: window(self.profile_secs),
            streak: window(self.streak_secs),
        }
    }
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return Some(PathBuf::from(path));
        }
    }
    None
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from)
}
