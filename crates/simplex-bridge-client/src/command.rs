// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Commands understood by the chat process.
//!
//! Commands are positional text lines; some embed a JSON argument. Each
//! variant knows its exact rendering and the response types it accepts.

use serde::Serialize;
use simplex_bridge_core::BridgeError;
use strum::IntoStaticStr;

use crate::types::{ChatPagination, ChatRef, ComposedMessage, DeleteMode, GroupProfile, MsgContent, MsgReaction};

#[derive(Debug, Clone, PartialEq, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Command {
    GetActiveUser,
    ListContacts {
        user_id: i64,
    },
    ListGroups {
        user_id: i64,
    },
    ListMembers {
        group_id: i64,
    },
    GetChat {
        chat: ChatRef,
        pagination: ChatPagination,
    },
    SendMessages {
        chat: ChatRef,
        messages: Vec<ComposedMessage>,
    },
    UpdateChatItem {
        chat: ChatRef,
        item_id: i64,
        content: MsgContent,
    },
    DeleteChatItem {
        chat: ChatRef,
        item_id: i64,
        mode: DeleteMode,
    },
    React {
        chat: ChatRef,
        item_id: i64,
        emoji: String,
        add: bool,
    },
    AcceptContact {
        request_id: i64,
    },
    CreateAddress {
        user_id: i64,
    },
    SetAddressAutoAccept {
        user_id: i64,
        auto_accept: bool,
        auto_reply: Option<MsgContent>,
    },
    JoinGroup {
        group_id: i64,
    },
    ReceiveFile {
        file_id: i64,
    },
    UpdateGroupProfile {
        group_id: i64,
        profile: GroupProfile,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdatedMessage<'a> {
    msg_content: &'a MsgContent,
    mentions: serde_json::Map<String, serde_json::Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AddressSettings<'a> {
    business_address: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    auto_accept: Option<AutoAccept>,
    #[serde(skip_serializing_if = "Option::is_none")]
    auto_reply: Option<&'a MsgContent>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AutoAccept {
    accept_incognito: bool,
}

#[derive(Serialize)]
struct DeleteModeArg {
    #[serde(rename = "type")]
    mode: DeleteMode,
}

impl Command {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// The command line sent in the frame's `cmd` field.
    pub fn render(&self) -> Result<String, BridgeError> {
        Ok(match self {
            Self::GetActiveUser => "/u".to_string(),
            Self::ListContacts { user_id } => format!("/_contacts {user_id}"),
            Self::ListGroups { user_id } => format!("/_groups{user_id}"),
            Self::ListMembers { group_id } => format!("/_members #{group_id}"),
            Self::GetChat { chat, pagination } => format!("/_get chat {chat} {pagination}"),
            Self::SendMessages { chat, messages } => {
                format!("/_send {chat} live=off json {}", to_json(messages)?)
            }
            Self::UpdateChatItem {
                chat,
                item_id,
                content,
            } => {
                let updated = UpdatedMessage {
                    msg_content: content,
                    mentions: serde_json::Map::new(),
                };
                format!("/_update item {chat} {item_id} live=off json{}", to_json(&updated)?)
            }
            Self::DeleteChatItem {
                chat,
                item_id,
                mode,
            } => format!(
                "/_delete item {chat} [{item_id}] {}",
                to_json(&DeleteModeArg { mode: *mode })?
            ),
            Self::React {
                chat,
                item_id,
                emoji,
                add,
            } => {
                let toggle = if *add { "on" } else { "off" };
                let reaction = MsgReaction::emoji(emoji.as_str());
                format!("/_reaction {chat} {item_id} {toggle} {}", to_json(&reaction)?)
            }
            Self::AcceptContact { request_id } => format!("/_accept incognito=off {request_id}"),
            Self::CreateAddress { user_id } => format!("/_address {user_id}"),
            Self::SetAddressAutoAccept {
                user_id,
                auto_accept,
                auto_reply,
            } => {
                let settings = if *auto_accept {
                    AddressSettings {
                        business_address: false,
                        auto_accept: Some(AutoAccept {
                            accept_incognito: false,
                        }),
                        auto_reply: auto_reply.as_ref(),
                    }
                } else {
                    AddressSettings {
                        business_address: false,
                        auto_accept: None,
                        auto_reply: None,
                    }
                };
                format!("/_address_settings {user_id} {}", to_json(&settings)?)
            }
            Self::JoinGroup { group_id } => format!("/_join #{group_id}"),
            Self::ReceiveFile { file_id } => format!("/freceive {file_id} approved_relays=on"),
            Self::UpdateGroupProfile { group_id, profile } => {
                format!("/_group_profile #{group_id} {}", to_json(profile)?)
            }
        })
    }

    /// Response types that count as success.
    pub fn expected_responses(&self) -> &'static [&'static str] {
        match self {
            Self::GetActiveUser => &["activeUser"],
            Self::ListContacts { .. } => &["contactsList"],
            Self::ListGroups { .. } => &["groupsList"],
            Self::ListMembers { .. } => &["groupMembers"],
            Self::GetChat { .. } => &["apiChat"],
            Self::SendMessages { .. } => &["newChatItems"],
            Self::UpdateChatItem { .. } => &["chatItemUpdated"],
            Self::DeleteChatItem { .. } => &["chatItemsDeleted"],
            Self::React { .. } => &["chatItemReaction"],
            Self::AcceptContact { .. } => &["acceptingContactRequest"],
            Self::CreateAddress { .. } => &["userContactLinkCreated"],
            Self::SetAddressAutoAccept { .. } => &["userContactLinkUpdated"],
            Self::JoinGroup { .. } => &["userAcceptedGroupSent"],
            Self::ReceiveFile { .. } => &["rcvFileAccepted", "rcvFileAcceptedSndCancelled"],
            Self::UpdateGroupProfile { .. } => &["groupUpdated"],
        }
    }

    /// True when any message in a send batch references a local file.
    pub fn carries_file(&self) -> bool {
        match self {
            Self::SendMessages { messages, .. } => messages.iter().any(|m| m.file_source.is_some()),
            _ => false,
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, BridgeError> {
    serde_json::to_string(value)
        .map_err(|e| BridgeError::Protocol(format!("failed to encode command argument: {e}")))
}
