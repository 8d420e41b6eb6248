// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entry point the framework uses to create and restore logins.

use std::sync::Arc;

use simplex_bridge_config::model::BridgeConfig;
use simplex_bridge_core::types::{LoginFlow, NetworkCapabilities};
use simplex_bridge_core::{BridgeError, BridgeFramework, LoginMetadata, UserLoginId};

use crate::capabilities;
use crate::client::SimplexNetworkClient;
use crate::login::{self, LoginProcess};
use crate::preview::LinkPreviewer;

pub struct SimplexConnector {
    config: Arc<BridgeConfig>,
    framework: Arc<dyn BridgeFramework>,
    previews: Arc<LinkPreviewer>,
}

impl SimplexConnector {
    pub fn new(
        config: Arc<BridgeConfig>,
        framework: Arc<dyn BridgeFramework>,
    ) -> Result<Self, BridgeError> {
        let previews = Arc::new(LinkPreviewer::new(config.bridge.link_preview_family_dns)?);
        Ok(Self {
            config,
            framework,
            previews,
        })
    }

    pub fn config(&self) -> &Arc<BridgeConfig> {
        &self.config
    }

    pub fn login_flows(&self) -> Vec<LoginFlow> {
        login::login_flows()
    }

    pub fn network_capabilities(&self) -> NetworkCapabilities {
        capabilities::network_capabilities()
    }

    pub fn create_login(&self, flow_id: &str) -> Result<LoginProcess, BridgeError> {
        LoginProcess::new(
            flow_id,
            Arc::clone(&self.config),
            Arc::clone(&self.framework),
            Arc::clone(&self.previews),
        )
    }

    /// Restores a persisted login. The client is not connected yet.
    pub fn load_login(
        &self,
        login_id: UserLoginId,
        metadata: LoginMetadata,
    ) -> Result<Arc<SimplexNetworkClient>, BridgeError> {
        SimplexNetworkClient::load(
            Arc::clone(&self.config),
            Arc::clone(&self.framework),
            Arc::clone(&self.previews),
            login_id,
            metadata,
        )
        .map(Arc::new)
    }
}
