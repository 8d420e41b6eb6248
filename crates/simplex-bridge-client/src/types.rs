// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Protocol data types of the SimpleX chat API.
//!
//! Field names follow the chat process's camelCase JSON. Structs default
//! missing fields, since the process omits empty values freely; tagged
//! payloads (`chatInfo`, `chatDir`) decode into closed enums with a catch-all.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChatType {
    #[serde(rename = "@")]
    Direct,
    #[serde(rename = "#")]
    Group,
}

impl ChatType {
    pub fn prefix(self) -> char {
        match self {
            Self::Direct => '@',
            Self::Group => '#',
        }
    }
}

/// A chat reference, rendered `@<contactId>` or `#<groupId>` in commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChatRef {
    pub chat_type: ChatType,
    pub chat_id: i64,
}

impl ChatRef {
    pub fn direct(contact_id: i64) -> Self {
        Self {
            chat_type: ChatType::Direct,
            chat_id: contact_id,
        }
    }

    pub fn group(group_id: i64) -> Self {
        Self {
            chat_type: ChatType::Group,
            chat_id: group_id,
        }
    }
}

impl fmt::Display for ChatRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.chat_type.prefix(), self.chat_id)
    }
}

/// Window selection for `/_get chat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPagination {
    Last { count: u32 },
    Before { item_id: i64, count: u32 },
    After { item_id: i64, count: u32 },
    Around { item_id: i64, count: u32 },
    Initial { count: u32 },
}

impl fmt::Display for ChatPagination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Last { count } => write!(f, "count={count}"),
            Self::Before { item_id, count } => write!(f, "before={item_id} count={count}"),
            Self::After { item_id, count } => write!(f, "after={item_id} count={count}"),
            Self::Around { item_id, count } => write!(f, "around={item_id} count={count}"),
            Self::Initial { count } => write!(f, "initial={count}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteMode {
    Broadcast,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupMemberRole {
    Observer,
    Author,
    #[default]
    Member,
    Moderator,
    Admin,
    Owner,
    #[serde(other)]
    Unknown,
}

impl GroupMemberRole {
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin | Self::Owner)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    pub user_id: i64,
    pub profile: Profile,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    pub display_name: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupProfile {
    pub display_name: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(rename = "groupDescription", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Contact {
    pub contact_id: i64,
    pub local_display_name: String,
    pub profile: Profile,
    pub contact_used: bool,
    pub created_at: String,
}

impl Contact {
    /// Profile display name, else the local display name.
    pub fn display_name(&self) -> &str {
        non_empty_or(&self.profile.display_name, &self.local_display_name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupInfo {
    pub group_id: i64,
    pub local_display_name: String,
    pub group_profile: GroupProfile,
    pub membership: GroupMember,
    pub created_at: String,
}

impl GroupInfo {
    pub fn display_name(&self) -> &str {
        non_empty_or(&self.group_profile.display_name, &self.local_display_name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupMember {
    pub group_member_id: i64,
    pub group_id: i64,
    /// Base64-encoded member id, stable across groups.
    pub member_id: String,
    pub member_role: GroupMemberRole,
    pub member_category: String,
    pub member_status: String,
    pub local_display_name: String,
    pub profile: Profile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<i64>,
}

impl GroupMember {
    pub fn display_name(&self) -> &str {
        non_empty_or(&self.profile.display_name, &self.local_display_name)
    }

    /// Active, creator, and admin members are present in the chat.
    pub fn is_present(&self) -> bool {
        matches!(
            self.member_status.as_str(),
            "memActive" | "memCreator" | "memAdmin"
        )
    }
}

fn non_empty_or<'a>(preferred: &'a str, fallback: &'a str) -> &'a str {
    if preferred.is_empty() {
        fallback
    } else {
        preferred
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatItemMeta {
    pub item_id: i64,
    pub item_sent: bool,
    pub created_at: String,
    pub item_text: String,
    pub item_status: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_deleted: Option<Value>,
    pub item_edited: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatItemContent {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg_content: Option<MsgContent>,
}

/// Message content as sent and received.
///
/// `image` is required by the chat process for image and video content (an
/// empty thumbnail is accepted) and `duration` for video and voice. Use the
/// constructors to get those right.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MsgContent {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<LinkPreview>,
}

impl MsgContent {
    fn of(content_type: &str, text: impl Into<String>) -> Self {
        Self {
            content_type: content_type.to_string(),
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::of("text", text)
    }

    pub fn file(file_name: impl Into<String>) -> Self {
        Self::of("file", file_name)
    }

    pub fn image(text: impl Into<String>, thumbnail: impl Into<String>) -> Self {
        Self {
            image: Some(thumbnail.into()),
            ..Self::of("image", text)
        }
    }

    pub fn video(text: impl Into<String>, thumbnail: impl Into<String>, duration_secs: i64) -> Self {
        Self {
            image: Some(thumbnail.into()),
            duration: Some(duration_secs),
            ..Self::of("video", text)
        }
    }

    pub fn voice(text: impl Into<String>, duration_secs: i64) -> Self {
        Self {
            duration: Some(duration_secs),
            ..Self::of("voice", text)
        }
    }

    pub fn link(text: impl Into<String>, preview: LinkPreview) -> Self {
        Self {
            preview: Some(preview),
            ..Self::of("link", text)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LinkPreview {
    pub uri: String,
    pub title: String,
    pub description: String,
    /// Data URI of the preview image; may be empty.
    pub image: String,
}

/// A file attached to a chat item, or announced by a transfer event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileTransfer {
    pub file_id: i64,
    pub file_name: String,
    pub file_size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    pub file_status: Value,
}

impl FileTransfer {
    /// Local path once the file has been downloaded.
    pub fn local_path(&self) -> Option<&str> {
        self.file_path.as_deref().filter(|p| !p.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatItem {
    pub chat_dir: ChatItemDir,
    pub meta: ChatItemMeta,
    pub content: ChatItemContent,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub formatted_text: Vec<FormattedText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<FileTransfer>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reactions: Vec<ReactionCount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quoted_item: Option<QuotedItem>,
}

impl ChatItem {
    /// A file is attached but not yet on disk.
    pub fn has_pending_file(&self) -> bool {
        self.file.as_ref().is_some_and(|f| f.local_path().is_none())
    }

    pub fn msg_content(&self) -> Option<&MsgContent> {
        self.content.msg_content.as_ref()
    }
}

/// Direction of a chat item, tagged by `type`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChatItemDir {
    DirectSnd,
    DirectRcv,
    GroupSnd,
    #[serde(rename_all = "camelCase")]
    GroupRcv { group_member: GroupMember },
    #[default]
    #[serde(other)]
    Other,
}

impl ChatItemDir {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::DirectSnd | Self::GroupSnd)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormattedText {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<Format>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Format {
    /// `bold`, `italic`, `strikeThrough`, `snipped`, `colored`, `uri`, `email`,
    /// `phone`, or `mention`.
    #[serde(rename = "type")]
    pub format_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReactionCount {
    pub reaction: MsgReaction,
    pub reaction_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MsgReaction {
    #[serde(rename = "type")]
    pub reaction_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub emoji: String,
}

impl MsgReaction {
    pub fn emoji(emoji: impl Into<String>) -> Self {
        Self {
            reaction_type: "emoji".to_string(),
            emoji: emoji.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuotedItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<i64>,
    pub sent_at: String,
    pub content: ChatItemContent,
}

/// The chat an item belongs to, tagged by `type`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChatInfo {
    Direct {
        contact: Contact,
    },
    #[serde(rename_all = "camelCase")]
    Group {
        group_info: GroupInfo,
    },
    #[default]
    #[serde(other)]
    Other,
}

impl ChatInfo {
    pub fn chat_ref(&self) -> Option<ChatRef> {
        match self {
            Self::Direct { contact } => Some(ChatRef::direct(contact.contact_id)),
            Self::Group { group_info } => Some(ChatRef::group(group_info.group_id)),
            Self::Other => None,
        }
    }

    pub fn contact(&self) -> Option<&Contact> {
        match self {
            Self::Direct { contact } => Some(contact),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AChatItem {
    pub chat_info: ChatInfo,
    pub chat_item: ChatItem,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AChat {
    pub chat_info: ChatInfo,
    pub chat_items: Vec<ChatItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatItemDeletion {
    pub deleted_chat_item: Option<AChatItem>,
    pub to_chat_item: Option<AChatItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemReaction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_dir: Option<ChatItemDir>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_item: Option<ChatItem>,
    pub reaction: MsgReaction,
    pub reaction_at: String,
}

/// A reaction with the chat it happened in and, when known, who made it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AItemReaction {
    pub chat_info: ChatInfo,
    pub chat_reaction: ItemReaction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_member: Option<GroupMember>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_contact: Option<Contact>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactRequest {
    pub contact_request_id: i64,
    pub local_display_name: String,
    pub profile: Profile,
}

/// One message in a `/_send` batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposedMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_source: Option<CryptoFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quoted_item_id: Option<i64>,
    #[serde(default)]
    pub mentions: BTreeMap<String, i64>,
    pub msg_content: MsgContent,
}

impl ComposedMessage {
    pub fn new(msg_content: MsgContent) -> Self {
        Self {
            msg_content,
            ..Default::default()
        }
    }

    pub fn with_file(mut self, file_path: impl Into<String>) -> Self {
        self.file_source = Some(CryptoFile {
            file_path: file_path.into(),
        });
        self
    }

    pub fn quoting(mut self, item_id: Option<i64>) -> Self {
        self.quoted_item_id = item_id;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoFile {
    pub file_path: String,
}
