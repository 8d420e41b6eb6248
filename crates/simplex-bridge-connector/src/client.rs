// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-login network client driven by the framework.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use simplex_bridge_config::model::BridgeConfig;
use simplex_bridge_core::types::{
    BridgeState, BridgeStateEvent, ChatInfo, FetchMessagesParams, FetchMessagesResponse,
    MessageResponse, OutgoingEdit, OutgoingMessage, OutgoingReaction, OutgoingRemove, RoomFeatures,
    RoomType, UserInfo,
};
use simplex_bridge_core::{
    BridgeError, BridgeFramework, LoginMetadata, NetworkApi, PortalKey, UserId, UserLoginId,
};

use crate::lifecycle::{self, ConnectionState};
use crate::managed::{ManagedProcess, ws_port};
use crate::preview::LinkPreviewer;
use crate::session::LoginSession;
use crate::{backfill, capabilities, chatinfo, outbound};

pub const NO_WS_URL_MESSAGE: &str = "No WebSocket URL configured. Please log in again.";

struct Running {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Network client for one SimpleX login.
pub struct SimplexNetworkClient {
    session: Arc<LoginSession>,
    running: Mutex<Option<Running>>,
    managed: Mutex<Option<ManagedProcess>>,
}

impl SimplexNetworkClient {
    pub fn load(
        config: Arc<BridgeConfig>,
        framework: Arc<dyn BridgeFramework>,
        previews: Arc<LinkPreviewer>,
        login_id: UserLoginId,
        metadata: LoginMetadata,
    ) -> Result<Self, BridgeError> {
        let session = LoginSession::new(config, framework, login_id, metadata, previews)?;
        Ok(Self {
            session: Arc::new(session),
            running: Mutex::new(None),
            managed: Mutex::new(None),
        })
    }

    pub fn session(&self) -> &Arc<LoginSession> {
        &self.session
    }

    pub fn state(&self) -> ConnectionState {
        self.session.state()
    }

    /// Hands over a process started during login.
    pub async fn attach_managed_process(&self, process: ManagedProcess) {
        if let Some(previous) = self.managed.lock().await.replace(process) {
            previous.stop().await;
        }
    }

    /// Disconnects and stops a managed process.
    pub async fn logout(&self) {
        self.disconnect().await;
        info!(login_id = %self.session.login_id(), "logged out");
    }

    /// The login's URL, else the configured one.
    async fn ws_url(&self) -> Option<String> {
        self.session
            .metadata()
            .await
            .ws_url
            .filter(|url| !url.is_empty())
            .or_else(|| {
                self.session
                    .config
                    .simplex
                    .ws_url
                    .clone()
                    .filter(|url| !url.is_empty())
            })
    }

    /// Restarts the chat process of a managed login if it is not running.
    async fn ensure_managed_process(&self, ws_url: &str) {
        let metadata = self.session.metadata().await;
        if !metadata.managed {
            return;
        }
        let mut managed = self.managed.lock().await;
        if managed.is_some() {
            return;
        }
        let (Some(db_path), Some(port)) = (metadata.db_path.as_deref(), ws_port(ws_url)) else {
            warn!(ws_url, "managed login is missing its database path or port");
            return;
        };
        match ManagedProcess::spawn(&self.session.config.simplex.simplex_binary, port, db_path) {
            Ok(process) => *managed = Some(process),
            // The lifecycle keeps retrying the dial either way.
            Err(e) => warn!(error = %e, "failed to restart managed simplex-chat"),
        }
    }
}

#[async_trait]
impl NetworkApi for SimplexNetworkClient {
    async fn connect(&self) {
        let mut running = self.running.lock().await;
        if running.is_some() {
            debug!(login_id = %self.session.login_id(), "connection lifecycle already running");
            return;
        }
        let Some(ws_url) = self.ws_url().await else {
            self.session
                .framework
                .send_bridge_state(
                    BridgeState::new(BridgeStateEvent::BadCredentials).with_message(NO_WS_URL_MESSAGE),
                )
                .await;
            return;
        };
        self.ensure_managed_process(&ws_url).await;

        let cancel = CancellationToken::new();
        let task = tokio::spawn(lifecycle::run(
            Arc::clone(&self.session),
            ws_url,
            cancel.clone(),
        ));
        *running = Some(Running { cancel, task });
    }

    async fn disconnect(&self) {
        if let Some(Running { cancel, task }) = self.running.lock().await.take() {
            cancel.cancel();
            if let Err(e) = task.await {
                warn!(error = %e, "connection lifecycle task failed");
            }
        }
        if let Some(client) = self.session.client.swap(None) {
            client.close().await;
        }
        if let Some(process) = self.managed.lock().await.take() {
            process.stop().await;
        }
    }

    fn is_logged_in(&self) -> bool {
        self.session.has_client()
    }

    fn is_this_user(&self, user: &UserId) -> bool {
        self.session.has_client() && *user == self.session.self_user_id()
    }

    async fn handle_message(&self, msg: OutgoingMessage) -> Result<MessageResponse, BridgeError> {
        outbound::send_message(&self.session, msg).await
    }

    async fn handle_edit(&self, edit: OutgoingEdit) -> Result<(), BridgeError> {
        outbound::send_edit(&self.session, edit).await
    }

    async fn handle_reaction(&self, reaction: OutgoingReaction) -> Result<(), BridgeError> {
        outbound::send_reaction(&self.session, reaction, true).await
    }

    async fn handle_reaction_remove(&self, reaction: OutgoingReaction) -> Result<(), BridgeError> {
        outbound::send_reaction(&self.session, reaction, false).await
    }

    async fn handle_message_remove(&self, remove: OutgoingRemove) -> Result<(), BridgeError> {
        outbound::send_remove(&self.session, remove).await
    }

    async fn get_chat_info(&self, portal: &PortalKey) -> Result<ChatInfo, BridgeError> {
        chatinfo::chat_info(&self.session, portal).await
    }

    async fn get_user_info(&self, user: &UserId) -> Result<UserInfo, BridgeError> {
        chatinfo::user_info(&self.session, user).await
    }

    async fn fetch_messages(
        &self,
        params: FetchMessagesParams,
    ) -> Result<FetchMessagesResponse, BridgeError> {
        backfill::fetch_messages(&self.session, params).await
    }

    fn capabilities(&self, room_type: RoomType) -> RoomFeatures {
        capabilities::room_features(room_type)
    }
}
