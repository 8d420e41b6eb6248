// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Login flows: attach to a running simplex-chat, or start one.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use simplex_bridge_client::types::User;
use simplex_bridge_client::{ChatClient, ClientConfig};
use simplex_bridge_config::model::BridgeConfig;
use simplex_bridge_core::types::{LoginField, LoginFieldKind, LoginFlow, LoginStep};
use simplex_bridge_core::{BridgeError, BridgeFramework, LoginMetadata, NetworkApi};

use crate::client::SimplexNetworkClient;
use crate::ids;
use crate::managed::{ManagedProcess, free_port};
use crate::preview::LinkPreviewer;

pub const FLOW_WEBSOCKET: &str = "websocket";
pub const FLOW_MANAGED: &str = "managed";

pub const STEP_WS_URL: &str = "simplex.login.ws_url";
pub const STEP_MANAGED_DB_PATH: &str = "simplex.login.managed_db_path";
pub const STEP_COMPLETE: &str = "simplex.login.complete";

pub const WS_URL_PATTERN: &str = "^wss?://.+";

pub fn login_flows() -> Vec<LoginFlow> {
    vec![
        LoginFlow {
            id: FLOW_WEBSOCKET,
            name: "WebSocket URL",
            description: "Connect to a running simplex-chat instance",
        },
        LoginFlow {
            id: FLOW_MANAGED,
            name: "Managed",
            description: "Provide a SimpleX database path and let the bridge manage the process",
        },
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    WebSocket,
    Managed,
}

/// A completed login: the final step and the connected network client.
pub struct LoginResult {
    pub step: LoginStep,
    pub client: Arc<SimplexNetworkClient>,
}

/// One in-progress login.
pub struct LoginProcess {
    flow: Flow,
    config: Arc<BridgeConfig>,
    framework: Arc<dyn BridgeFramework>,
    previews: Arc<LinkPreviewer>,
}

impl LoginProcess {
    pub(crate) fn new(
        flow_id: &str,
        config: Arc<BridgeConfig>,
        framework: Arc<dyn BridgeFramework>,
        previews: Arc<LinkPreviewer>,
    ) -> Result<Self, BridgeError> {
        let flow = match flow_id {
            FLOW_WEBSOCKET => Flow::WebSocket,
            FLOW_MANAGED => Flow::Managed,
            other => {
                return Err(BridgeError::Config(format!("invalid login flow ID: {other}")));
            }
        };
        Ok(Self {
            flow,
            config,
            framework,
            previews,
        })
    }

    /// The input step the user sees first.
    pub fn start(&self) -> LoginStep {
        match self.flow {
            Flow::WebSocket => LoginStep::UserInput {
                step_id: STEP_WS_URL,
                instructions: "Enter the WebSocket URL of your running simplex-chat instance \
                               (e.g. ws://localhost:5225)"
                    .to_string(),
                fields: vec![LoginField {
                    id: "ws_url",
                    name: "WebSocket URL",
                    kind: LoginFieldKind::Url,
                    pattern: Some(WS_URL_PATTERN),
                }],
            },
            Flow::Managed => LoginStep::UserInput {
                step_id: STEP_MANAGED_DB_PATH,
                instructions: "Enter the path to your SimpleX Chat database directory \
                               (the directory containing your profile files)"
                    .to_string(),
                fields: vec![LoginField {
                    id: "db_path",
                    name: "Database path",
                    kind: LoginFieldKind::Token,
                    pattern: None,
                }],
            },
        }
    }

    /// Verifies the input against the chat process, persists the login, and
    /// starts its connection.
    pub async fn submit_user_input(
        self,
        input: &BTreeMap<String, String>,
    ) -> Result<LoginResult, BridgeError> {
        match self.flow {
            Flow::WebSocket => self.submit_ws_url(input).await,
            Flow::Managed => self.submit_db_path(input).await,
        }
    }

    async fn submit_ws_url(
        self,
        input: &BTreeMap<String, String>,
    ) -> Result<LoginResult, BridgeError> {
        let ws_url = required(input, "ws_url")?;
        if !(ws_url.starts_with("ws://") || ws_url.starts_with("wss://")) {
            return Err(BridgeError::Config(format!(
                "ws_url must start with ws:// or wss://, got {ws_url:?}"
            )));
        }
        info!(ws_url, "connecting to simplex-chat to verify login");

        let (client, _events) =
            ChatClient::connect(ClientConfig::new(ws_url, &self.config.simplex)).await?;
        let user = client.get_active_user().await;
        client.close().await;
        let user = user?;

        let metadata = LoginMetadata {
            ws_url: Some(ws_url.to_string()),
            ..Default::default()
        };
        let instructions = format!(
            "Successfully logged in as {} (user ID {})",
            user.profile.display_name, user.user_id
        );
        self.complete(&user, metadata, instructions, None).await
    }

    async fn submit_db_path(
        self,
        input: &BTreeMap<String, String>,
    ) -> Result<LoginResult, BridgeError> {
        let db_path = required(input, "db_path")?;
        let port = free_port().await?;
        let mut process = ManagedProcess::spawn(&self.config.simplex.simplex_binary, port, db_path)?;

        let (client, _events) = match process.wait_ready(&self.config.simplex).await {
            Ok(connected) => connected,
            Err(e) => {
                process.stop().await;
                return Err(e);
            }
        };
        let user = client.get_active_user().await;
        client.close().await;
        let user = match user {
            Ok(user) => user,
            Err(e) => {
                process.stop().await;
                return Err(e);
            }
        };

        let metadata = LoginMetadata {
            ws_url: Some(process.ws_url()),
            db_path: Some(db_path.to_string()),
            managed: true,
            ..Default::default()
        };
        let instructions = format!(
            "Successfully started managed simplex-chat for {} (user ID {})",
            user.profile.display_name, user.user_id
        );
        self.complete(&user, metadata, instructions, Some(process)).await
    }

    async fn complete(
        self,
        user: &User,
        metadata: LoginMetadata,
        instructions: String,
        process: Option<ManagedProcess>,
    ) -> Result<LoginResult, BridgeError> {
        let login_id = ids::login_id(user.user_id);
        if let Err(e) = self.framework.save_login_metadata(&login_id, &metadata).await {
            if let Some(process) = process {
                process.stop().await;
            }
            return Err(e);
        }

        let client = Arc::new(SimplexNetworkClient::load(
            Arc::clone(&self.config),
            Arc::clone(&self.framework),
            Arc::clone(&self.previews),
            login_id.clone(),
            metadata.clone(),
        )?);
        if let Some(process) = process {
            client.attach_managed_process(process).await;
        }
        client.connect().await;

        Ok(LoginResult {
            step: LoginStep::Complete {
                step_id: STEP_COMPLETE,
                instructions,
                login_id,
                remote_name: user.profile.display_name.clone(),
                metadata,
            },
            client,
        })
    }
}

fn required<'a>(input: &'a BTreeMap<String, String>, field: &str) -> Result<&'a str, BridgeError> {
    input
        .get(field)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| BridgeError::Config(format!("{field} is required")))
}
