// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! State shared by everything acting on behalf of one login.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tokio::sync::{Mutex, watch};

use simplex_bridge_client::ChatClient;
use simplex_bridge_client::types::{self as sx, ChatItemDir, ChatRef};
use simplex_bridge_config::model::BridgeConfig;
use simplex_bridge_core::{
    BridgeError, BridgeFramework, EventSender, LoginMetadata, PortalKey, RemoteEvent, UserId,
    UserLoginId,
};

use crate::echo::EchoTracker;
use crate::ids;
use crate::lifecycle::ConnectionState;
use crate::preview::LinkPreviewer;

/// One logged-in SimpleX user.
///
/// The live [`ChatClient`] is swapped in by the lifecycle task on every
/// (re)connect. A client whose connection dropped stays in place until it is
/// replaced, so sends fail with a transport error instead of `NotLoggedIn`.
pub struct LoginSession {
    pub(crate) config: Arc<BridgeConfig>,
    pub(crate) framework: Arc<dyn BridgeFramework>,
    pub(crate) login_id: UserLoginId,
    pub(crate) remote_user_id: i64,
    pub(crate) client: ArcSwapOption<ChatClient>,
    pub(crate) echoes: EchoTracker,
    pub(crate) previews: Arc<LinkPreviewer>,
    metadata: Mutex<LoginMetadata>,
    state: watch::Sender<ConnectionState>,
}

impl LoginSession {
    pub fn new(
        config: Arc<BridgeConfig>,
        framework: Arc<dyn BridgeFramework>,
        login_id: UserLoginId,
        metadata: LoginMetadata,
        previews: Arc<LinkPreviewer>,
    ) -> Result<Self, BridgeError> {
        let remote_user_id = ids::parse_login_id(&login_id)?;
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Ok(Self {
            config,
            framework,
            login_id,
            remote_user_id,
            client: ArcSwapOption::empty(),
            echoes: EchoTracker::new(),
            previews,
            metadata: Mutex::new(metadata),
            state,
        })
    }

    pub fn login_id(&self) -> &UserLoginId {
        &self.login_id
    }

    pub fn portal_key(&self, chat: ChatRef) -> PortalKey {
        ids::portal_key(chat, &self.login_id)
    }

    /// The ghost key of the logged-in user.
    pub fn self_user_id(&self) -> UserId {
        ids::user_id(self.remote_user_id)
    }

    pub fn self_sender(&self) -> EventSender {
        EventSender::me(self.self_user_id())
    }

    /// Who authored an item, from its direction and the chat it belongs to.
    pub fn sender_for(&self, dir: &ChatItemDir, chat_info: &sx::ChatInfo) -> EventSender {
        match dir {
            ChatItemDir::DirectSnd | ChatItemDir::GroupSnd => self.self_sender(),
            ChatItemDir::DirectRcv => match chat_info.contact() {
                Some(contact) => EventSender::remote(ids::user_id(contact.contact_id)),
                None => EventSender::unknown(),
            },
            ChatItemDir::GroupRcv { group_member } => {
                EventSender::remote(ids::member_sender_id(group_member))
            }
            ChatItemDir::Other => EventSender::unknown(),
        }
    }

    /// The current client, connected or not.
    pub fn current_client(&self) -> Result<Arc<ChatClient>, BridgeError> {
        self.client.load_full().ok_or(BridgeError::NotLoggedIn)
    }

    pub fn has_client(&self) -> bool {
        self.client.load().is_some()
    }

    pub async fn queue(&self, event: RemoteEvent) {
        self.framework.queue_remote_event(event).await;
    }

    pub async fn metadata(&self) -> LoginMetadata {
        self.metadata.lock().await.clone()
    }

    /// Applies `update` to the login metadata and persists the result.
    pub async fn update_metadata(
        &self,
        update: impl FnOnce(&mut LoginMetadata),
    ) -> Result<(), BridgeError> {
        let mut metadata = self.metadata.lock().await;
        update(&mut metadata);
        self.framework
            .save_login_metadata(&self.login_id, &metadata)
            .await
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub(crate) fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }
}
