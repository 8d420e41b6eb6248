// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::{BridgeConfig, MIN_MAX_MESSAGE_SIZE};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first.
pub fn validate_config(config: &BridgeConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let level = config.bridge.log_level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::validation(
            "bridge.log_level",
            format!(
                "`{}` is not one of {}",
                config.bridge.log_level,
                LOG_LEVELS.join(", ")
            ),
        ));
    }

    if config.bridge.displayname_template.trim().is_empty() {
        errors.push(ConfigError::validation(
            "bridge.displayname_template",
            "must not be empty",
        ));
    }

    if let Some(url) = config.simplex.ws_url.as_deref()
        && !(url.starts_with("ws://") || url.starts_with("wss://"))
    {
        errors.push(ConfigError::validation(
            "simplex.ws_url",
            format!("`{url}` must start with ws:// or wss://"),
        ));
    }

    if config.simplex.simplex_binary.trim().is_empty() {
        errors.push(ConfigError::validation(
            "simplex.simplex_binary",
            "must not be empty",
        ));
    }

    if config.simplex.max_message_size < MIN_MAX_MESSAGE_SIZE {
        errors.push(ConfigError::validation(
            "simplex.max_message_size",
            format!(
                "must be at least {MIN_MAX_MESSAGE_SIZE} bytes (100 MiB), got {}",
                config.simplex.max_message_size
            ),
        ));
    }

    for (key, value) in [
        (
            "simplex.event_queue_capacity",
            config.simplex.event_queue_capacity as u64,
        ),
        ("simplex.dial_timeout_secs", config.simplex.dial_timeout_secs),
        (
            "simplex.one_shot_timeout_secs",
            config.simplex.one_shot_timeout_secs,
        ),
        ("simplex.max_backoff_secs", config.simplex.max_backoff_secs),
        (
            "simplex.managed_connect_attempts",
            u64::from(config.simplex.managed_connect_attempts),
        ),
    ] {
        if value == 0 {
            errors.push(ConfigError::validation(key, "must be greater than zero"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(errors: &[ConfigError]) -> Vec<String> {
        errors
            .iter()
            .filter_map(|e| match e {
                ConfigError::Validation { key, .. } => Some(key.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&BridgeConfig::default()).is_ok());
    }

    #[test]
    fn rejects_http_ws_url() {
        let mut config = BridgeConfig::default();
        config.simplex.ws_url = Some("http://localhost:5225".into());
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(keys(&errors), vec!["simplex.ws_url"]);
    }

    #[test]
    fn accepts_wss_url() {
        let mut config = BridgeConfig::default();
        config.simplex.ws_url = Some("wss://chat.example.org".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn rejects_small_max_message_size() {
        let mut config = BridgeConfig::default();
        config.simplex.max_message_size = 1024 * 1024;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(keys(&errors), vec!["simplex.max_message_size"]);
    }

    #[test]
    fn rejects_unknown_log_level() {
        let mut config = BridgeConfig::default();
        config.bridge.log_level = "verbose".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(keys(&errors), vec!["bridge.log_level"]);
    }

    #[test]
    fn collects_all_errors() {
        let mut config = BridgeConfig::default();
        config.simplex.event_queue_capacity = 0;
        config.simplex.max_backoff_secs = 0;
        config.bridge.displayname_template = "  ".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(keys(&errors).contains(&"simplex.max_backoff_secs".to_string()));
    }
}
