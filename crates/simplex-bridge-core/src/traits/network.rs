// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The bridge as seen from the bridging framework.

use async_trait::async_trait;

use crate::error::BridgeError;
use crate::types::{
    ChatInfo, FetchMessagesParams, FetchMessagesResponse, MessageResponse, OutgoingEdit,
    OutgoingMessage, OutgoingReaction, OutgoingRemove, PortalKey, RoomFeatures, RoomType, UserId,
    UserInfo,
};

/// Per-login network client driven by the framework.
#[async_trait]
pub trait NetworkApi: Send + Sync {
    /// Starts the connection lifecycle. Returns once the lifecycle task runs.
    async fn connect(&self);

    /// Cancels any retry wait and closes the live connection.
    async fn disconnect(&self);

    fn is_logged_in(&self) -> bool;

    fn is_this_user(&self, user: &UserId) -> bool;

    async fn handle_message(&self, msg: OutgoingMessage) -> Result<MessageResponse, BridgeError>;

    async fn handle_edit(&self, edit: OutgoingEdit) -> Result<(), BridgeError>;

    async fn handle_reaction(&self, reaction: OutgoingReaction) -> Result<(), BridgeError>;

    async fn handle_reaction_remove(&self, reaction: OutgoingReaction) -> Result<(), BridgeError>;

    async fn handle_message_remove(&self, remove: OutgoingRemove) -> Result<(), BridgeError>;

    async fn get_chat_info(&self, portal: &PortalKey) -> Result<ChatInfo, BridgeError>;

    async fn get_user_info(&self, user: &UserId) -> Result<UserInfo, BridgeError>;

    async fn fetch_messages(
        &self,
        params: FetchMessagesParams,
    ) -> Result<FetchMessagesResponse, BridgeError>;

    fn capabilities(&self, room_type: RoomType) -> RoomFeatures;
}
