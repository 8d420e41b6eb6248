// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports the hierarchy `./simplex-bridge.toml` > `~/.config/simplex-bridge/config.toml`
//! > `/etc/simplex-bridge/config.toml` with environment variable overrides via
//! the `SIMPLEX_BRIDGE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::BridgeConfig;

pub const SYSTEM_CONFIG_PATH: &str = "/etc/simplex-bridge/config.toml";
pub const LOCAL_CONFIG_PATH: &str = "simplex-bridge.toml";
pub const ENV_PREFIX: &str = "SIMPLEX_BRIDGE_";

/// User config path under the XDG config directory.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("simplex-bridge/config.toml"))
}

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/simplex-bridge/config.toml` (system-wide)
/// 3. `~/.config/simplex-bridge/config.toml` (user XDG config)
/// 4. `./simplex-bridge.toml` (local directory)
/// 5. `SIMPLEX_BRIDGE_*` environment variables
pub fn load_config() -> Result<BridgeConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<BridgeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BridgeConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<BridgeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BridgeConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(BridgeConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

/// Environment provider mapping `SIMPLEX_BRIDGE_<SECTION>_<KEY>` to `<section>.<key>`.
///
/// Uses `Env::map()` rather than `Env::split("_")`: keys themselves contain
/// underscores, so `SIMPLEX_BRIDGE_SIMPLEX_WS_URL` must become `simplex.ws_url`.
/// Figment hands the closure the key in its original case.
fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX).map(|key| {
        let key_str = key.as_str().to_ascii_lowercase();
        let mapped = if let Some(rest) = key_str.strip_prefix("bridge_") {
            format!("bridge.{rest}")
        } else if let Some(rest) = key_str.strip_prefix("simplex_") {
            format!("simplex.{rest}")
        } else {
            key_str.to_string()
        };
        mapped.into()
    })
}
