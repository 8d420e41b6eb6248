// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Encoding of remote identifiers into bridge keys.
//!
//! | Key | Form |
//! |---|---|
//! | portal | `d:<contactId>` or `g:<groupId>` |
//! | user | `<contactId>` or `m:<memberId>` |
//! | message | `<itemId>` |
//! | login | `<userId>` |
//!
//! Decoding accepts only the canonical form produced by the encoders, so
//! every key decodes back to exactly one remote id.

use simplex_bridge_client::types::{ChatInfo, ChatRef, ChatType, GroupMember};
use simplex_bridge_core::{BridgeError, MessageId, PortalId, PortalKey, UserId, UserLoginId};

const DIRECT_PREFIX: &str = "d:";
const GROUP_PREFIX: &str = "g:";
const MEMBER_PREFIX: &str = "m:";

/// The remote party a user key refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteUser {
    Contact(i64),
    /// A group member with no contact, by base64 member id.
    Member(String),
}

pub fn portal_id(chat: ChatRef) -> PortalId {
    let prefix = match chat.chat_type {
        ChatType::Direct => DIRECT_PREFIX,
        ChatType::Group => GROUP_PREFIX,
    };
    PortalId(format!("{prefix}{}", chat.chat_id))
}

pub fn parse_portal_id(id: &PortalId) -> Result<ChatRef, BridgeError> {
    let raw = id.as_str();
    if let Some(rest) = raw.strip_prefix(DIRECT_PREFIX) {
        Ok(ChatRef::direct(parse_canonical("portal", raw, rest)?))
    } else if let Some(rest) = raw.strip_prefix(GROUP_PREFIX) {
        Ok(ChatRef::group(parse_canonical("portal", raw, rest)?))
    } else {
        Err(invalid("portal", raw))
    }
}

pub fn portal_key(chat: ChatRef, login: &UserLoginId) -> PortalKey {
    PortalKey {
        id: portal_id(chat),
        receiver: login.clone(),
    }
}

/// Portal key for the chat an item belongs to; `None` for chat kinds the
/// bridge does not handle.
pub fn portal_key_for(info: &ChatInfo, login: &UserLoginId) -> Option<PortalKey> {
    info.chat_ref().map(|chat| portal_key(chat, login))
}

pub fn user_id(contact_id: i64) -> UserId {
    UserId(contact_id.to_string())
}

pub fn member_user_id(member_id: &str) -> UserId {
    UserId(format!("{MEMBER_PREFIX}{member_id}"))
}

/// A member is keyed by its contact when it has one.
pub fn member_sender_id(member: &GroupMember) -> UserId {
    match member.contact_id {
        Some(contact_id) => user_id(contact_id),
        None => member_user_id(&member.member_id),
    }
}

pub fn parse_user_id(id: &UserId) -> Result<RemoteUser, BridgeError> {
    let raw = id.as_str();
    match raw.strip_prefix(MEMBER_PREFIX) {
        Some("") => Err(invalid("user", raw)),
        Some(member) => Ok(RemoteUser::Member(member.to_string())),
        None => parse_canonical("user", raw, raw).map(RemoteUser::Contact),
    }
}

pub fn message_id(item_id: i64) -> MessageId {
    MessageId(item_id.to_string())
}

pub fn parse_message_id(id: &MessageId) -> Result<i64, BridgeError> {
    parse_canonical("message", id.as_str(), id.as_str())
}

pub fn login_id(user_id: i64) -> UserLoginId {
    UserLoginId(user_id.to_string())
}

pub fn parse_login_id(id: &UserLoginId) -> Result<i64, BridgeError> {
    parse_canonical("login", id.as_str(), id.as_str())
}

fn parse_canonical(kind: &'static str, raw: &str, digits: &str) -> Result<i64, BridgeError> {
    match digits.parse::<i64>() {
        Ok(n) if n.to_string() == digits => Ok(n),
        _ => Err(invalid(kind, raw)),
    }
}

fn invalid(kind: &'static str, value: &str) -> BridgeError {
    BridgeError::InvalidId {
        kind,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn portal_ids_by_chat_kind() {
        assert_eq!(portal_id(ChatRef::direct(42)).as_str(), "d:42");
        assert_eq!(portal_id(ChatRef::group(7)).as_str(), "g:7");
        assert_eq!(parse_portal_id(&PortalId::from("d:42")).unwrap(), ChatRef::direct(42));
        assert_eq!(parse_portal_id(&PortalId::from("g:7")).unwrap(), ChatRef::group(7));
    }

    #[test]
    fn malformed_portal_ids_are_rejected() {
        for raw in ["42", "x:42", "d:", "d:abc", "g:+7", "g:007", "d: 1", "unknown:direct"] {
            let err = parse_portal_id(&PortalId::from(raw)).unwrap_err();
            assert!(
                matches!(err, BridgeError::InvalidId { kind: "portal", .. }),
                "{raw} should be rejected, got {err:?}"
            );
        }
    }

    #[test]
    fn user_ids_distinguish_members() {
        assert_eq!(parse_user_id(&user_id(5)).unwrap(), RemoteUser::Contact(5));
        assert_eq!(
            parse_user_id(&member_user_id("aGVsbG8=")).unwrap(),
            RemoteUser::Member("aGVsbG8=".into())
        );
        assert!(parse_user_id(&UserId::from("m:")).is_err());
        assert!(parse_user_id(&UserId::from("bob")).is_err());
    }

    #[test]
    fn member_sender_prefers_contact() {
        let mut member = GroupMember {
            member_id: "bWVt".into(),
            ..Default::default()
        };
        assert_eq!(member_sender_id(&member).as_str(), "m:bWVt");
        member.contact_id = Some(9);
        assert_eq!(member_sender_id(&member).as_str(), "9");
    }

    #[test]
    fn message_and_login_ids() {
        assert_eq!(parse_message_id(&message_id(100)).unwrap(), 100);
        assert_eq!(parse_login_id(&login_id(1)).unwrap(), 1);
        assert!(parse_message_id(&MessageId::from("")).is_err());
        assert!(parse_login_id(&UserLoginId::from("1.0")).is_err());
    }

    #[test]
    fn portal_key_for_unknown_chat_kind() {
        let login = login_id(1);
        assert!(portal_key_for(&ChatInfo::Other, &login).is_none());
        let key = portal_key(ChatRef::group(3), &login);
        assert_eq!(key.id.as_str(), "g:3");
        assert_eq!(key.receiver.as_str(), "1");
    }
}
