// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `simplex-bridge run` and the one-off address commands.
//!
//! `run` logs in through one of the login flows and keeps the connection
//! lifecycle going until SIGINT or SIGTERM, handing every normalized event to
//! [`LoggingFramework`].

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use simplex_bridge_client::{ChatClient, ClientConfig};
use simplex_bridge_config::BridgeConfig;
use simplex_bridge_connector::SimplexConnector;
use simplex_bridge_connector::login::{FLOW_MANAGED, FLOW_WEBSOCKET};
use simplex_bridge_core::types::LoginStep;
use simplex_bridge_core::{BridgeError, NetworkApi};

use crate::framework::LoggingFramework;
use crate::shutdown;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// How `run` reaches the chat process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginTarget {
    WebSocket(String),
    Managed(PathBuf),
}

impl LoginTarget {
    /// Picks the target from the command line, falling back to `simplex.ws_url`.
    pub fn resolve(
        config: &BridgeConfig,
        ws_url: Option<String>,
        managed_db: Option<PathBuf>,
    ) -> Result<Self, BridgeError> {
        match (ws_url, managed_db) {
            (Some(url), _) => Ok(Self::WebSocket(url)),
            (None, Some(db)) => Ok(Self::Managed(db)),
            (None, None) => config
                .simplex
                .ws_url
                .clone()
                .map(Self::WebSocket)
                .ok_or_else(no_ws_url),
        }
    }

    fn flow_input(&self) -> (&'static str, &'static str, String) {
        match self {
            Self::WebSocket(url) => (FLOW_WEBSOCKET, "ws_url", url.clone()),
            Self::Managed(db) => (FLOW_MANAGED, "db_path", db.display().to_string()),
        }
    }
}

fn no_ws_url() -> BridgeError {
    BridgeError::Config("no WebSocket URL: pass --ws-url or set simplex.ws_url".into())
}

/// Initializes the tracing subscriber. `RUST_LOG` wins over the configured level.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("simplex_bridge={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

/// Runs the bridge until a shutdown signal arrives.
pub async fn run_bridge(config: BridgeConfig, target: LoginTarget) -> Result<(), BridgeError> {
    let cancel = shutdown::install_signal_handler()?;
    let framework = Arc::new(LoggingFramework::new());
    let connector = SimplexConnector::new(Arc::new(config), framework.clone())?;

    let (flow, field, value) = target.flow_input();
    info!(flow, "logging in");
    let mut input = BTreeMap::new();
    input.insert(field.to_string(), value);
    let result = connector.create_login(flow)?.submit_user_input(&input).await?;

    let login_id = match &result.step {
        LoginStep::Complete {
            login_id,
            instructions,
            ..
        } => {
            info!(login_id = %login_id, "{instructions}");
            login_id.clone()
        }
        LoginStep::UserInput { step_id, .. } => {
            return Err(BridgeError::Internal(format!(
                "login stopped at unexpected step {step_id}"
            )));
        }
    };

    cancel.cancelled().await;
    info!("shutting down");
    let client = Arc::clone(&result.client);
    shutdown::drain(async move { client.disconnect().await }, SHUTDOWN_TIMEOUT).await;
    debug!(metadata = ?framework.metadata(&login_id), "final login metadata");
    Ok(())
}

async fn connect_once(
    config: &BridgeConfig,
    ws_url: Option<String>,
) -> Result<ChatClient, BridgeError> {
    let url = ws_url
        .or_else(|| config.simplex.ws_url.clone())
        .ok_or_else(no_ws_url)?;
    let (client, _events) = ChatClient::connect(ClientConfig::new(url, &config.simplex)).await?;
    Ok(client)
}

/// Creates the active user's contact address, optionally turning on auto-accept.
///
/// Returns the short link when the chat process provides one.
pub async fn create_address(
    config: &BridgeConfig,
    ws_url: Option<String>,
    auto_accept: bool,
) -> Result<String, BridgeError> {
    let client = connect_once(config, ws_url).await?;
    let outcome = async {
        let user = client.get_active_user().await?;
        let link = client.create_address(user.user_id).await?;
        if auto_accept {
            client
                .set_address_auto_accept(user.user_id, true, None)
                .await?;
        }
        Ok(link)
    }
    .await;
    client.close().await;
    outcome
}

/// Joins a group the active user was invited to. Returns the group's display name.
pub async fn join_group(
    config: &BridgeConfig,
    ws_url: Option<String>,
    group_id: i64,
) -> Result<String, BridgeError> {
    let client = connect_once(config, ws_url).await?;
    let outcome = client.join_group(group_id).await;
    client.close().await;
    Ok(outcome?.group_profile.display_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_url_wins() {
        let mut config = BridgeConfig::default();
        config.simplex.ws_url = Some("ws://configured:5225".into());
        let target = LoginTarget::resolve(&config, Some("ws://cli:5225".into()), None).unwrap();
        assert_eq!(target, LoginTarget::WebSocket("ws://cli:5225".into()));
    }

    #[test]
    fn configured_url_is_the_fallback() {
        let mut config = BridgeConfig::default();
        config.simplex.ws_url = Some("ws://configured:5225".into());
        let target = LoginTarget::resolve(&config, None, None).unwrap();
        assert_eq!(target, LoginTarget::WebSocket("ws://configured:5225".into()));
    }

    #[test]
    fn managed_db_selects_managed_flow() {
        let target =
            LoginTarget::resolve(&BridgeConfig::default(), None, Some("/var/lib/sx".into()))
                .unwrap();
        let (flow, field, value) = target.flow_input();
        assert_eq!(flow, FLOW_MANAGED);
        assert_eq!(field, "db_path");
        assert_eq!(value, "/var/lib/sx");
    }

    #[test]
    fn missing_url_is_a_config_error() {
        let err = LoginTarget::resolve(&BridgeConfig::default(), None, None).unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
    }
}
