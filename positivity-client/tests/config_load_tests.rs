//! `ClientConfig::load` reads the process environment, so these checks live
//! in their own test binary and run as a single test.

use positivity_client::config::{ClientConfig, ConfigError, CONFIG_ENV_VAR};
use std::io::Write;

const SAMPLE_TOML: &str = r#"
relogin_delay_ms = 300
event_capacity = 64
log_filter = "info"

[query_retry]
attempts = 2
initial_backoff_ms = 1000
max_backoff_ms = 30000
multiplier = 2.0

[mutation_retry]
attempts = 1
initial_backoff_ms = 1000
max_backoff_ms = 30000
multiplier = 2.0

[staleness]
daily_message_secs = 3600
streak_secs = 0
profile_secs = 0
"#;

#[test]
fn load_follows_config_env_var() {
    std::env::remove_var(CONFIG_ENV_VAR);
    assert!(matches!(
        ClientConfig::load(),
        Err(ConfigError::MissingConfigPath)
    ));

    let mut valid = tempfile::NamedTempFile::new().unwrap();
    valid.write_all(SAMPLE_TOML.as_bytes()).unwrap();
    std::env::set_var(CONFIG_ENV_VAR, valid.path());
    let config = ClientConfig::load().unwrap();
    assert_eq!(config.relogin_delay_ms, 300);
    assert_eq!(config.query_retry.attempts, 2);

    let mut invalid = tempfile::NamedTempFile::new().unwrap();
    let broken = SAMPLE_TOML.replace("event_capacity = 64", "event_capacity = 0");
    invalid.write_all(broken.as_bytes()).unwrap();
    std::env::set_var(CONFIG_ENV_VAR, invalid.path());
    assert!(matches!(
        ClientConfig::load(),
        Err(ConfigError::InvalidValue {
            field: "event_capacity",
            ..
        })
    ));

    std::env::remove_var(CONFIG_ENV_VAR);
}
