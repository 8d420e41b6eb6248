// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed client for the SimpleX chat WebSocket API.

use serde::Deserialize;
use simplex_bridge_core::BridgeError;
use tracing::{debug, warn};

use crate::command::Command;
use crate::mux::{EventStream, Multiplexer};
use crate::oneshot::send_once;
use crate::transport::{ClientConfig, dial};
use crate::types::{
    AChat, AChatItem, ChatItem, ChatPagination, ChatRef, ComposedMessage, Contact, DeleteMode,
    GroupInfo, GroupMember, GroupProfile, MsgContent, User,
};
use crate::wire::{CorrIdGen, Response};

/// One live connection to a chat process.
///
/// Never reconnects on its own; the owner replaces the whole client after the
/// event stream ends.
pub struct ChatClient {
    config: ClientConfig,
    corr_ids: CorrIdGen,
    mux: Multiplexer,
}

impl ChatClient {
    /// Dials the endpoint and starts the reader. The returned stream yields
    /// every unsolicited frame until the connection drops.
    pub async fn connect(config: ClientConfig) -> Result<(Self, EventStream), BridgeError> {
        let ws = dial(&config).await?;
        let corr_ids = CorrIdGen::new();
        let (mux, events) = Multiplexer::start(ws, corr_ids.clone(), config.event_queue_capacity);
        Ok((
            Self {
                config,
                corr_ids,
                mux,
            },
            events,
        ))
    }

    pub fn ws_url(&self) -> &str {
        &self.config.ws_url
    }

    pub async fn is_closed(&self) -> bool {
        self.mux.is_closed().await
    }

    pub async fn close(&self) {
        self.mux.close().await;
    }

    /// Sends a command on the persistent connection and checks the response type.
    pub async fn send_cmd(&self, cmd: &Command) -> Result<Response, BridgeError> {
        let line = cmd.render()?;
        debug!(command = cmd.name(), "sending command");
        self.mux.send(&line).await?.expect(cmd.expected_responses())
    }

    /// Like [`send_cmd`](Self::send_cmd), but a transport failure on the
    /// persistent connection is retried once over a fresh one-shot connection.
    ///
    /// Response-type mismatches are not retried: the command reached the
    /// process and was answered.
    pub async fn send_cmd_retry_once(&self, cmd: &Command) -> Result<Response, BridgeError> {
        let line = cmd.render()?;
        debug!(command = cmd.name(), "sending command with one-shot fallback");
        let response = match self.mux.send(&line).await {
            Ok(response) => response,
            Err(e) if e.is_transport() => {
                warn!(command = cmd.name(), error = %e, "connection lost during send; retrying on one-shot connection");
                send_once(&self.config, &self.corr_ids, &line).await?
            }
            Err(e) => return Err(e),
        };
        response.expect(cmd.expected_responses())
    }

    pub async fn get_active_user(&self) -> Result<User, BridgeError> {
        #[derive(Deserialize)]
        struct ActiveUser {
            user: User,
        }
        let r: ActiveUser = self.send_cmd(&Command::GetActiveUser).await?.decode()?;
        Ok(r.user)
    }

    pub async fn list_contacts(&self, user_id: i64) -> Result<Vec<Contact>, BridgeError> {
        #[derive(Deserialize)]
        struct ContactsList {
            #[serde(default)]
            contacts: Vec<Contact>,
        }
        let r: ContactsList = self.send_cmd(&Command::ListContacts { user_id }).await?.decode()?;
        Ok(r.contacts)
    }

    pub async fn list_groups(&self, user_id: i64) -> Result<Vec<GroupInfo>, BridgeError> {
        #[derive(Deserialize)]
        struct GroupsList {
            #[serde(default)]
            groups: Vec<GroupInfo>,
        }
        let r: GroupsList = self.send_cmd(&Command::ListGroups { user_id }).await?.decode()?;
        Ok(r.groups)
    }

    pub async fn list_members(&self, group_id: i64) -> Result<Vec<GroupMember>, BridgeError> {
        #[derive(Deserialize)]
        struct GroupMembers {
            group: Members,
        }
        #[derive(Deserialize)]
        struct Members {
            #[serde(default)]
            members: Vec<GroupMember>,
        }
        let r: GroupMembers = self.send_cmd(&Command::ListMembers { group_id }).await?.decode()?;
        Ok(r.group.members)
    }

    pub async fn get_chat(&self, chat: ChatRef, pagination: ChatPagination) -> Result<AChat, BridgeError> {
        #[derive(Deserialize)]
        struct ApiChat {
            chat: AChat,
        }
        let r: ApiChat = self
            .send_cmd(&Command::GetChat { chat, pagination })
            .await?
            .decode()?;
        Ok(r.chat)
    }

    pub async fn send_messages(
        &self,
        chat: ChatRef,
        messages: Vec<ComposedMessage>,
    ) -> Result<Vec<AChatItem>, BridgeError> {
        let response = self.send_cmd(&Command::SendMessages { chat, messages }).await?;
        decode_chat_items(response)
    }

    /// File-bearing sends: one one-shot retry after a transport failure.
    pub async fn send_messages_retry_once(
        &self,
        chat: ChatRef,
        messages: Vec<ComposedMessage>,
    ) -> Result<Vec<AChatItem>, BridgeError> {
        let response = self
            .send_cmd_retry_once(&Command::SendMessages { chat, messages })
            .await?;
        decode_chat_items(response)
    }

    pub async fn update_chat_item(
        &self,
        chat: ChatRef,
        item_id: i64,
        content: MsgContent,
    ) -> Result<ChatItem, BridgeError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Updated {
            chat_item: AChatItem,
        }
        let r: Updated = self
            .send_cmd(&Command::UpdateChatItem {
                chat,
                item_id,
                content,
            })
            .await?
            .decode()?;
        Ok(r.chat_item.chat_item)
    }

    pub async fn delete_chat_item(&self, chat: ChatRef, item_id: i64, mode: DeleteMode) -> Result<(), BridgeError> {
        self.send_cmd(&Command::DeleteChatItem { chat, item_id, mode })
            .await
            .map(drop)
    }

    pub async fn react_to_chat_item(
        &self,
        chat: ChatRef,
        item_id: i64,
        emoji: &str,
        add: bool,
    ) -> Result<(), BridgeError> {
        self.send_cmd(&Command::React {
            chat,
            item_id,
            emoji: emoji.to_string(),
            add,
        })
        .await
        .map(drop)
    }

    pub async fn accept_contact(&self, request_id: i64) -> Result<Contact, BridgeError> {
        #[derive(Deserialize)]
        struct Accepting {
            contact: Contact,
        }
        let r: Accepting = self.send_cmd(&Command::AcceptContact { request_id }).await?.decode()?;
        Ok(r.contact)
    }

    /// Creates the user's contact address; returns the short link when available.
    pub async fn create_address(&self, user_id: i64) -> Result<String, BridgeError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Created {
            conn_link_contact: ConnLink,
        }
        #[derive(Deserialize, Default)]
        #[serde(rename_all = "camelCase", default)]
        struct ConnLink {
            conn_short_link: String,
            conn_full_link: String,
        }
        let r: Created = self.send_cmd(&Command::CreateAddress { user_id }).await?.decode()?;
        let link = r.conn_link_contact;
        Ok(if link.conn_short_link.is_empty() {
            link.conn_full_link
        } else {
            link.conn_short_link
        })
    }

    pub async fn set_address_auto_accept(
        &self,
        user_id: i64,
        auto_accept: bool,
        auto_reply: Option<MsgContent>,
    ) -> Result<(), BridgeError> {
        self.send_cmd(&Command::SetAddressAutoAccept {
            user_id,
            auto_accept,
            auto_reply,
        })
        .await
        .map(drop)
    }

    pub async fn join_group(&self, group_id: i64) -> Result<GroupInfo, BridgeError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Joined {
            group_info: GroupInfo,
        }
        let r: Joined = self.send_cmd(&Command::JoinGroup { group_id }).await?.decode()?;
        Ok(r.group_info)
    }

    pub async fn receive_file(&self, file_id: i64) -> Result<(), BridgeError> {
        self.send_cmd(&Command::ReceiveFile { file_id }).await.map(drop)
    }

    pub async fn update_group_profile(&self, group_id: i64, profile: GroupProfile) -> Result<GroupInfo, BridgeError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Updated {
            to_group: GroupInfo,
        }
        let r: Updated = self
            .send_cmd(&Command::UpdateGroupProfile { group_id, profile })
            .await?
            .decode()?;
        Ok(r.to_group)
    }
}

fn decode_chat_items(response: Response) -> Result<Vec<AChatItem>, BridgeError> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct NewItems {
        #[serde(default)]
        chat_items: Vec<AChatItem>,
    }
    let r: NewItems = response.decode()?;
    Ok(r.chat_items)
}
