// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat and ghost metadata built from the chat process's contact and group lists.

use std::collections::BTreeMap;

use tracing::debug;

use simplex_bridge_client::types::{ChatType, Contact, GroupInfo, GroupMember};
use simplex_bridge_core::types::{
    Avatar, ChatInfo, ChatMember, ChatMemberList, RoomType, UserInfo,
};
use simplex_bridge_core::{BridgeError, EventSender, PortalKey, UserId};

use crate::ids::{self, RemoteUser};
use crate::session::LoginSession;

pub const DM_TOPIC: &str = "SimpleX DM";
pub const ADMIN_POWER_LEVEL: i64 = 50;
pub const MEMBER_POWER_LEVEL: i64 = 0;

/// Fresh chat info for a portal, looked up on the live connection.
pub async fn chat_info(session: &LoginSession, portal: &PortalKey) -> Result<ChatInfo, BridgeError> {
    let chat = ids::parse_portal_id(&portal.id)?;
    let client = session.current_client()?;
    match chat.chat_type {
        ChatType::Direct => {
            let contacts = client.list_contacts(session.remote_user_id).await?;
            let contact = contacts
                .iter()
                .find(|c| c.contact_id == chat.chat_id)
                .ok_or_else(|| BridgeError::Protocol(format!("contact {} not found", chat.chat_id)))?;
            Ok(direct_info(contact, session.self_user_id()))
        }
        ChatType::Group => {
            let groups = client.list_groups(session.remote_user_id).await?;
            let group = groups
                .iter()
                .find(|g| g.group_id == chat.chat_id)
                .ok_or_else(|| BridgeError::Protocol(format!("group {} not found", chat.chat_id)))?;
            let members = client.list_members(group.group_id).await?;
            debug!(group_id = group.group_id, members = members.len(), "fetched group members");
            Ok(group_info(group, &members, session.self_user_id()))
        }
    }
}

/// A direct chat: the contact and the logged-in user.
pub fn direct_info(contact: &Contact, self_user: UserId) -> ChatInfo {
    let other = ids::user_id(contact.contact_id);
    let mut members = BTreeMap::new();
    members.insert(
        other.clone(),
        ChatMember {
            sender: EventSender::remote(other.clone()),
            power_level: None,
        },
    );
    members.insert(
        self_user.clone(),
        ChatMember {
            sender: EventSender::me(self_user),
            power_level: None,
        },
    );
    ChatInfo {
        name: Some(contact.display_name().to_string()),
        topic: Some(DM_TOPIC.to_string()),
        members: Some(ChatMemberList {
            is_full: true,
            members,
            other_user: Some(other),
        }),
        room_type: Some(RoomType::Dm),
        avatar: avatar(format!("contact:{}", contact.contact_id), contact.profile.image.as_deref()),
    }
}

/// A group chat with its present members; the logged-in user is added as admin.
pub fn group_info(group: &GroupInfo, members: &[GroupMember], self_user: UserId) -> ChatInfo {
    let mut list: BTreeMap<UserId, ChatMember> = members
        .iter()
        .filter(|m| m.is_present())
        .map(|m| {
            let id = ids::member_sender_id(m);
            let power = if m.member_role.is_admin() {
                ADMIN_POWER_LEVEL
            } else {
                MEMBER_POWER_LEVEL
            };
            let member = ChatMember {
                sender: EventSender::remote(id.clone()),
                power_level: Some(power),
            };
            (id, member)
        })
        .collect();
    list.insert(
        self_user.clone(),
        ChatMember {
            sender: EventSender::me(self_user),
            power_level: Some(ADMIN_POWER_LEVEL),
        },
    );
    ChatInfo {
        name: Some(group.display_name().to_string()),
        topic: Some(group.group_profile.description.clone().unwrap_or_default()),
        members: Some(ChatMemberList {
            is_full: true,
            members: list,
            other_user: None,
        }),
        room_type: Some(RoomType::Default),
        avatar: avatar(
            format!("group:{}", group.group_id),
            group.group_profile.image.as_deref(),
        ),
    }
}

/// Ghost profile for a remote user. Member-only ids and unknown contacts
/// yield empty info.
pub async fn user_info(session: &LoginSession, user: &UserId) -> Result<UserInfo, BridgeError> {
    let contact_id = match ids::parse_user_id(user)? {
        RemoteUser::Contact(id) => id,
        RemoteUser::Member(_) => return Ok(UserInfo::default()),
    };
    let client = session.current_client()?;
    let contacts = client.list_contacts(session.remote_user_id).await?;
    Ok(contacts
        .iter()
        .find(|c| c.contact_id == contact_id)
        .map(|c| contact_user_info(session, c))
        .unwrap_or_default())
}

pub fn contact_user_info(session: &LoginSession, contact: &Contact) -> UserInfo {
    UserInfo {
        name: Some(
            session
                .config
                .bridge
                .format_displayname(contact.display_name(), contact.contact_id),
        ),
        is_bot: Some(false),
        avatar: avatar(format!("contact:{}", contact.contact_id), contact.profile.image.as_deref()),
    }
}

fn avatar(id: String, image: Option<&str>) -> Option<Avatar> {
    image.filter(|data| !data.is_empty()).map(|data| Avatar {
        id,
        data_uri: data.to_string(),
    })
}
