// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the SimpleX bridge.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Minimum accepted WebSocket message size. Media travels base64-encoded
/// inside JSON frames.
pub const MIN_MAX_MESSAGE_SIZE: usize = 100 * 1024 * 1024;

/// Section names accepted at the top level of the config file.
pub const SECTIONS: &[&str] = &["bridge", "simplex"];

/// Keys of the `[bridge]` section.
pub const BRIDGE_KEYS: &[&str] = &[
    "log_level",
    "displayname_template",
    "files_folder",
    "link_preview_family_dns",
];

/// Keys of the `[simplex]` section.
pub const SIMPLEX_KEYS: &[&str] = &[
    "ws_url",
    "simplex_binary",
    "max_message_size",
    "event_queue_capacity",
    "dial_timeout_secs",
    "one_shot_timeout_secs",
    "max_backoff_secs",
    "managed_connect_attempts",
];

/// Accepted keys at a table path: the section list for the root, or a
/// section's own keys.
pub fn keys_at(path: &[String]) -> Option<&'static [&'static str]> {
    match path {
        [] => Some(SECTIONS),
        [section] if section == "bridge" => Some(BRIDGE_KEYS),
        [section] if section == "simplex" => Some(SIMPLEX_KEYS),
        _ => None,
    }
}

/// Top-level bridge configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Bridge behaviour and presentation settings.
    #[serde(default)]
    pub bridge: BridgeSection,

    /// Connection settings for the SimpleX chat process.
    #[serde(default)]
    pub simplex: SimplexConfig,
}

/// Bridge behaviour and presentation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeSection {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Template for ghost display names. Supports `{{.DisplayName}}` and `{{.ContactID}}`.
    #[serde(default = "default_displayname_template")]
    pub displayname_template: String,

    /// Directory the SimpleX process stores received files in.
    ///
    /// Relative paths reported by the process are resolved against it.
    #[serde(default)]
    pub files_folder: Option<String>,

    /// Resolve link-preview hosts through family-filtering DNS servers.
    #[serde(default)]
    pub link_preview_family_dns: bool,
}

impl Default for BridgeSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            displayname_template: default_displayname_template(),
            files_folder: None,
            link_preview_family_dns: false,
        }
    }
}

impl BridgeSection {
    /// Renders a ghost display name from the configured template.
    pub fn format_displayname(&self, display_name: &str, contact_id: i64) -> String {
        self.displayname_template
            .replace("{{.DisplayName}}", display_name)
            .replace("{{.ContactID}}", &contact_id.to_string())
    }

    /// Folder relative remote file paths are resolved against.
    ///
    /// Without `files_folder` this falls back to the platform download
    /// directory, which is where a default SimpleX install saves files. That
    /// fallback is a guess and only holds for default installs.
    pub fn effective_files_folder(&self) -> PathBuf {
        match self.files_folder.as_deref() {
            Some(folder) if !folder.is_empty() => PathBuf::from(folder),
            _ => dirs::download_dir()
                .or_else(|| dirs::home_dir().map(|h| h.join("Downloads")))
                .unwrap_or_else(|| PathBuf::from("Downloads")),
        }
    }

    /// Resolves a file path reported by the SimpleX process.
    pub fn resolve_file_path(&self, file_path: &str) -> PathBuf {
        let path = Path::new(file_path);
        if path.is_absolute() {
            return path.to_path_buf();
        }
        self.effective_files_folder().join(path)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_displayname_template() -> String {
    "{{.DisplayName}} (SimpleX)".to_string()
}

/// Connection settings for the SimpleX chat process.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SimplexConfig {
    /// WebSocket URL of a running simplex-chat instance (e.g. `ws://localhost:5225`).
    #[serde(default)]
    pub ws_url: Option<String>,

    /// Path to the simplex-chat binary used in managed mode.
    #[serde(default = "default_simplex_binary")]
    pub simplex_binary: String,

    /// Maximum size of a single WebSocket message in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,

    /// Capacity of the event queue between the reader and the ingestion loop.
    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,

    /// Timeout for establishing a WebSocket connection.
    #[serde(default = "default_dial_timeout_secs")]
    pub dial_timeout_secs: u64,

    /// Timeout for a complete one-shot fallback exchange.
    #[serde(default = "default_one_shot_timeout_secs")]
    pub one_shot_timeout_secs: u64,

    /// Upper bound for the reconnect backoff.
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,

    /// Dial attempts while waiting for a managed process to come up.
    #[serde(default = "default_managed_connect_attempts")]
    pub managed_connect_attempts: u32,
}

impl Default for SimplexConfig {
    fn default() -> Self {
        Self {
            ws_url: None,
            simplex_binary: default_simplex_binary(),
            max_message_size: default_max_message_size(),
            event_queue_capacity: default_event_queue_capacity(),
            dial_timeout_secs: default_dial_timeout_secs(),
            one_shot_timeout_secs: default_one_shot_timeout_secs(),
            max_backoff_secs: default_max_backoff_secs(),
            managed_connect_attempts: default_managed_connect_attempts(),
        }
    }
}

impl SimplexConfig {
    pub fn dial_timeout(&self) -> Duration {
        Duration::from_secs(self.dial_timeout_secs)
    }

    pub fn one_shot_timeout(&self) -> Duration {
        Duration::from_secs(self.one_shot_timeout_secs)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }
}

fn default_simplex_binary() -> String {
    "simplex-chat".to_string()
}

fn default_max_message_size() -> usize {
    MIN_MAX_MESSAGE_SIZE
}

fn default_event_queue_capacity() -> usize {
    64
}

fn default_dial_timeout_secs() -> u64 {
    10
}

fn default_one_shot_timeout_secs() -> u64 {
    120
}

fn default_max_backoff_secs() -> u64 {
    150
}

fn default_managed_connect_attempts() -> u32 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displayname_template_substitutes_fields() {
        let mut section = BridgeSection::default();
        assert_eq!(section.format_displayname("Alice", 7), "Alice (SimpleX)");
        section.displayname_template = "{{.DisplayName}} #{{.ContactID}}".into();
        assert_eq!(section.format_displayname("Bob", 42), "Bob #42");
    }

    #[test]
    fn absolute_file_paths_pass_through() {
        let section = BridgeSection {
            files_folder: Some("/srv/files".into()),
            ..Default::default()
        };
        assert_eq!(
            section.resolve_file_path("/tmp/photo.jpg"),
            PathBuf::from("/tmp/photo.jpg")
        );
    }

    #[test]
    fn relative_file_paths_join_files_folder() {
        let section = BridgeSection {
            files_folder: Some("/srv/files".into()),
            ..Default::default()
        };
        assert_eq!(
            section.resolve_file_path("photo.jpg"),
            PathBuf::from("/srv/files/photo.jpg")
        );
    }

    #[test]
    fn empty_files_folder_uses_fallback() {
        let section = BridgeSection {
            files_folder: Some(String::new()),
            ..Default::default()
        };
        let resolved = section.resolve_file_path("photo.jpg");
        assert!(resolved.ends_with("photo.jpg"));
        assert_ne!(resolved, PathBuf::from("photo.jpg"));
    }

    #[test]
    fn key_tables_match_serialized_config() {
        let mut config = BridgeConfig::default();
        config.bridge.files_folder = Some("/srv/files".into());
        config.simplex.ws_url = Some("ws://localhost:5225".into());
        let value = toml::Value::try_from(&config).unwrap();
        let table = value.as_table().unwrap();

        let mut sections: Vec<&str> = table.keys().map(String::as_str).collect();
        sections.sort_unstable();
        assert_eq!(sections, SECTIONS);

        for section in SECTIONS {
            let mut keys: Vec<&str> = table[*section]
                .as_table()
                .unwrap()
                .keys()
                .map(String::as_str)
                .collect();
            let mut expected = keys_at(&[section.to_string()]).unwrap().to_vec();
            keys.sort_unstable();
            expected.sort_unstable();
            assert_eq!(keys, expected, "keys of [{section}]");
        }
    }

    #[test]
    fn nested_paths_have_no_key_table() {
        assert!(keys_at(&["simplex".into(), "ws_url".into()]).is_none());
        assert!(keys_at(&["telegram".into()]).is_none());
    }

    #[test]
    fn simplex_defaults() {
        let config = SimplexConfig::default();
        assert_eq!(config.max_message_size, 100 * 1024 * 1024);
        assert_eq!(config.event_queue_capacity, 64);
        assert_eq!(config.max_backoff(), Duration::from_secs(150));
        assert_eq!(config.managed_connect_attempts, 10);
        assert_eq!(config.simplex_binary, "simplex-chat");
    }
}
