// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed events decoded from the unsolicited frame stream.
//!
//! Decoding reads the `type` tag first and then parses the payload for that
//! tag only. Unknown tags become [`SimplexEvent::Other`]; a known tag with a
//! payload that does not parse is a protocol error for that event alone.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use simplex_bridge_core::BridgeError;

use crate::types::{
    AChatItem, AItemReaction, ChatItemDeletion, Contact, ContactRequest, FileTransfer, GroupInfo,
    GroupMember, User,
};
use crate::wire::Event;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChatItems {
    #[serde(default)]
    pub user: User,
    #[serde(default)]
    pub chat_items: Vec<AChatItem>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatItemUpdated {
    #[serde(default)]
    pub user: User,
    pub chat_item: AChatItem,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatItemsDeleted {
    #[serde(default)]
    pub user: User,
    #[serde(default)]
    pub chat_item_deletions: Vec<ChatItemDeletion>,
    #[serde(default)]
    pub by_user: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatItemReaction {
    #[serde(default)]
    pub user: User,
    pub added: bool,
    pub reaction: AItemReaction,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactConnected {
    #[serde(default)]
    pub user: User,
    pub contact: Contact,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactUpdated {
    #[serde(default)]
    pub user: User,
    #[serde(default)]
    pub from_contact: Contact,
    pub to_contact: Contact,
}

/// `joinedGroupMember`, `deletedMember`, and `leftMember` all carry the group.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberChange {
    #[serde(default)]
    pub user: User,
    pub group_info: GroupInfo,
    #[serde(default, alias = "deletedMember")]
    pub member: Option<GroupMember>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupUpdated {
    #[serde(default)]
    pub user: User,
    #[serde(default)]
    pub from_group: GroupInfo,
    pub to_group: GroupInfo,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RcvFileDescrReady {
    #[serde(default)]
    pub user: User,
    pub rcv_file_transfer: FileTransfer,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RcvFileComplete {
    #[serde(default)]
    pub user: User,
    pub chat_item: AChatItem,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedContactRequest {
    #[serde(default)]
    pub user: User,
    pub contact_request: ContactRequest,
}

/// Every event type the bridge acts on.
#[derive(Debug, Clone, PartialEq)]
pub enum SimplexEvent {
    NewChatItems(NewChatItems),
    ChatItemUpdated(ChatItemUpdated),
    ChatItemsDeleted(ChatItemsDeleted),
    ChatItemReaction(ChatItemReaction),
    ContactConnected(ContactConnected),
    ContactUpdated(ContactUpdated),
    JoinedGroupMember(MemberChange),
    DeletedMember(MemberChange),
    LeftMember(MemberChange),
    GroupUpdated(GroupUpdated),
    RcvFileDescrReady(RcvFileDescrReady),
    RcvFileComplete(RcvFileComplete),
    ReceivedContactRequest(ReceivedContactRequest),
    /// `chatError` with its raw payload.
    ChatError(Value),
    /// Any type tag the bridge does not handle.
    Other(String),
}

impl SimplexEvent {
    pub fn decode(event: &Event) -> Result<Self, BridgeError> {
        let payload = &event.payload;
        let tag = event.event_type.as_str();
        Ok(match tag {
            "newChatItems" => Self::NewChatItems(parse(tag, payload)?),
            "chatItemUpdated" => Self::ChatItemUpdated(parse(tag, payload)?),
            "chatItemsDeleted" => Self::ChatItemsDeleted(parse(tag, payload)?),
            "chatItemReaction" => Self::ChatItemReaction(parse(tag, payload)?),
            "contactConnected" => Self::ContactConnected(parse(tag, payload)?),
            "contactUpdated" => Self::ContactUpdated(parse(tag, payload)?),
            "joinedGroupMember" => Self::JoinedGroupMember(parse(tag, payload)?),
            "deletedMember" => Self::DeletedMember(parse(tag, payload)?),
            "leftMember" => Self::LeftMember(parse(tag, payload)?),
            "groupUpdated" => Self::GroupUpdated(parse(tag, payload)?),
            "rcvFileDescrReady" => Self::RcvFileDescrReady(parse(tag, payload)?),
            "rcvFileComplete" => Self::RcvFileComplete(parse(tag, payload)?),
            "receivedContactRequest" => Self::ReceivedContactRequest(parse(tag, payload)?),
            "chatError" => Self::ChatError(payload.clone()),
            other => Self::Other(other.to_string()),
        })
    }
}

fn parse<T: DeserializeOwned>(tag: &str, payload: &Value) -> Result<T, BridgeError> {
    T::deserialize(payload).map_err(|e| BridgeError::decode(tag, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChatInfo, ChatItemDir};
    use serde_json::json;

    fn event(payload: Value) -> Event {
        Event {
            event_type: payload["type"].as_str().unwrap().to_string(),
            payload,
        }
    }

    #[test]
    fn decodes_new_chat_items() {
        let evt = event(json!({
            "type": "newChatItems",
            "user": {"userId": 1, "profile": {"displayName": "me"}},
            "chatItems": [{
                "chatInfo": {"type": "direct", "contact": {"contactId": 42}},
                "chatItem": {
                    "chatDir": {"type": "directRcv"},
                    "meta": {"itemId": 100, "createdAt": "2024-05-01T10:00:00Z", "itemText": "hi"},
                    "content": {"type": "rcvMsgContent", "msgContent": {"type": "text", "text": "hi"}}
                }
            }]
        }));
        let SimplexEvent::NewChatItems(data) = SimplexEvent::decode(&evt).unwrap() else {
            panic!("wrong variant");
        };
        assert_eq!(data.user.user_id, 1);
        let item = &data.chat_items[0];
        assert!(matches!(item.chat_info, ChatInfo::Direct { .. }));
        assert_eq!(item.chat_item.chat_dir, ChatItemDir::DirectRcv);
        assert_eq!(item.chat_item.meta.item_id, 100);
        assert_eq!(item.chat_item.msg_content().unwrap().text, "hi");
    }

    #[test]
    fn decodes_reaction_with_nested_item() {
        let evt = event(json!({
            "type": "chatItemReaction",
            "added": true,
            "reaction": {
                "chatInfo": {"type": "group", "groupInfo": {"groupId": 3}},
                "chatReaction": {
                    "chatItem": {"meta": {"itemId": 55}},
                    "reaction": {"type": "emoji", "emoji": "👍"},
                    "reactionAt": "2024-05-01T10:00:00Z"
                },
                "fromMember": {"groupMemberId": 9, "memberId": "bWVt"}
            }
        }));
        let SimplexEvent::ChatItemReaction(data) = SimplexEvent::decode(&evt).unwrap() else {
            panic!("wrong variant");
        };
        assert!(data.added);
        let target = data.reaction.chat_reaction.chat_item.as_ref().unwrap();
        assert_eq!(target.meta.item_id, 55);
        assert_eq!(data.reaction.chat_reaction.reaction.emoji, "👍");
        assert_eq!(data.reaction.from_member.unwrap().member_id, "bWVt");
    }

    #[test]
    fn deleted_member_uses_same_shape() {
        let evt = event(json!({
            "type": "deletedMember",
            "groupInfo": {"groupId": 12},
            "byMember": {"groupMemberId": 1},
            "deletedMember": {"groupMemberId": 2}
        }));
        let SimplexEvent::DeletedMember(data) = SimplexEvent::decode(&evt).unwrap() else {
            panic!("wrong variant");
        };
        assert_eq!(data.group_info.group_id, 12);
        assert_eq!(data.member.unwrap().group_member_id, 2);
    }

    #[test]
    fn unknown_tag_is_other() {
        let evt = event(json!({"type": "sndFileProgressXFTP"}));
        assert_eq!(
            SimplexEvent::decode(&evt).unwrap(),
            SimplexEvent::Other("sndFileProgressXFTP".into())
        );
    }

    #[test]
    fn chat_error_keeps_payload() {
        let payload = json!({"type": "chatError", "chatError": {"type": "error"}});
        let decoded = SimplexEvent::decode(&event(payload.clone())).unwrap();
        assert_eq!(decoded, SimplexEvent::ChatError(payload));
    }

    #[test]
    fn known_tag_with_bad_payload_fails() {
        let evt = event(json!({"type": "contactConnected", "contact": 5}));
        let err = SimplexEvent::decode(&evt).unwrap_err();
        assert!(err.is_protocol());
        assert!(err.to_string().contains("contactConnected"));
    }
}
