// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types exchanged between the bridge and the bridging framework.

use std::collections::BTreeMap;
use std::fmt;

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::BridgeError;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(
    /// Framework key for a remote chat (direct or group).
    PortalId
);
string_id!(
    /// Framework key for a remote user (contact or group member).
    UserId
);
string_id!(
    /// Framework key for a remote message.
    MessageId
);
string_id!(
    /// Framework key for a logged-in remote account.
    UserLoginId
);
string_id!(
    /// Marker linking a locally sent message to its asynchronous echo.
    TransactionId
);
string_id!(
    /// Identifies one part of a multi-part converted message.
    PartId
);

impl From<&MessageId> for TransactionId {
    fn from(id: &MessageId) -> Self {
        Self(id.0.clone())
    }
}

/// A portal scoped to the login that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortalKey {
    pub id: PortalId,
    pub receiver: UserLoginId,
}

/// Room flavour used by the framework when creating a portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum RoomType {
    Dm,
    Default,
}

/// Connection state reported to the framework for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BridgeStateEvent {
    Connecting,
    Connected,
    TransientDisconnect,
    BadCredentials,
}

/// A bridge state update with optional machine-readable error and human message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeState {
    pub state_event: BridgeStateEvent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl BridgeState {
    pub fn new(state_event: BridgeStateEvent) -> Self {
        Self {
            state_event,
            error: None,
            message: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>, message: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self.message = Some(message.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Who performed a remote action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventSender {
    pub is_from_me: bool,
    pub sender: UserId,
}

impl EventSender {
    pub fn remote(sender: UserId) -> Self {
        Self {
            is_from_me: false,
            sender,
        }
    }

    pub fn me(sender: UserId) -> Self {
        Self {
            is_from_me: true,
            sender,
        }
    }

    /// Placeholder for a sender that could not be resolved from the payload.
    pub fn unknown() -> Self {
        Self::remote(UserId::from("unknown"))
    }
}

/// A joined member of a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMember {
    pub sender: EventSender,
    pub power_level: Option<i64>,
}

/// Membership snapshot of a chat.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChatMemberList {
    /// The list is authoritative; members missing from it should be removed.
    pub is_full: bool,
    pub members: BTreeMap<UserId, ChatMember>,
    /// The other participant of a direct chat.
    pub other_user: Option<UserId>,
}

/// Chat metadata delivered with a resync.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChatInfo {
    pub name: Option<String>,
    pub topic: Option<String>,
    /// `None` refreshes metadata without membership reconciliation.
    pub members: Option<ChatMemberList>,
    pub room_type: Option<RoomType>,
    pub avatar: Option<Avatar>,
}

/// Ghost profile delivered for a remote user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserInfo {
    pub name: Option<String>,
    pub is_bot: Option<bool>,
    pub avatar: Option<Avatar>,
}

/// An avatar embedded in a remote profile as a base64 data URI.
///
/// Decoding is deferred until the framework actually needs the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Avatar {
    pub id: String,
    pub data_uri: String,
}

impl Avatar {
    /// Decodes the `data:<mime>;base64,<payload>` URI.
    ///
    /// Standard base64 is tried first, then the URL-safe alphabet.
    pub fn decode(&self) -> Result<Vec<u8>, BridgeError> {
        decode_data_uri(&self.data_uri)
    }
}

/// Decodes a base64 data URI into raw bytes.
pub fn decode_data_uri(data_uri: &str) -> Result<Vec<u8>, BridgeError> {
    let rest = data_uri
        .strip_prefix("data:")
        .ok_or_else(|| BridgeError::Protocol("not a data URI".into()))?;
    let (_, encoded) = rest
        .split_once(',')
        .ok_or_else(|| BridgeError::Protocol("malformed data URI: no comma".into()))?;
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE.decode(encoded))
        .map_err(|e| BridgeError::Protocol(format!("base64 decode: {e}")))
}

/// Message kind in the framework's content model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum MessageType {
    Text,
    Notice,
    Emote,
    Image,
    Video,
    Audio,
    File,
}

impl MessageType {
    pub fn is_media(self) -> bool {
        matches!(self, Self::Image | Self::Video | Self::Audio | Self::File)
    }
}

/// File metadata attached to media content.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileInfo {
    pub mime_type: Option<String>,
    pub size: Option<u64>,
    pub duration_ms: Option<u64>,
}

/// Message content as the framework represents it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContent {
    pub msg_type: MessageType,
    pub body: String,
    /// HTML rendering; present only when the message carries formatting.
    pub formatted_body: Option<String>,
    /// Real file name when `body` holds a caption.
    pub file_name: Option<String>,
    /// Media location in the framework's content repository.
    pub url: Option<String>,
    pub info: Option<FileInfo>,
}

impl MessageContent {
    pub fn text(body: impl Into<String>) -> Self {
        Self::new(MessageType::Text, body)
    }

    pub fn notice(body: impl Into<String>) -> Self {
        Self::new(MessageType::Notice, body)
    }

    pub fn new(msg_type: MessageType, body: impl Into<String>) -> Self {
        Self {
            msg_type,
            body: body.into(),
            formatted_body: None,
            file_name: None,
            url: None,
            info: None,
        }
    }

    /// Caption text for media: the body when a separate file name is set.
    pub fn caption(&self) -> &str {
        match &self.file_name {
            Some(name) if !name.is_empty() && *name != self.body => &self.body,
            _ => "",
        }
    }
}

/// One part of a converted remote message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedPart {
    pub id: PartId,
    pub content: MessageContent,
    /// Local path of an attachment that still has to be uploaded.
    pub pending_file: Option<String>,
}

/// A remote message converted into framework content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedMessage {
    pub reply_to: Option<MessageId>,
    pub parts: Vec<ConvertedPart>,
}

/// A message part the framework has already stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingPart {
    pub id: MessageId,
    pub part_id: PartId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedEditPart {
    pub part: ExistingPart,
    pub content: MessageContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConvertedEdit {
    pub modified_parts: Vec<ConvertedEditPart>,
}

/// Result of uploading media through the framework.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedMedia {
    pub url: String,
}

/// Per-login metadata persisted by the framework.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoginMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub managed: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub chats_synced: bool,
}

// --- Outbound (framework -> remote) ---

/// A message the framework wants delivered to a remote chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub portal: PortalKey,
    pub content: MessageContent,
    pub reply_to: Option<MessageId>,
}

/// Outcome of a successful outbound send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageResponse {
    pub id: MessageId,
    pub sender: UserId,
    pub timestamp: DateTime<Utc>,
    /// Transaction marker the framework drops from its pending set.
    pub remove_pending: TransactionId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEdit {
    pub portal: PortalKey,
    pub target: MessageId,
    pub content: MessageContent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingReaction {
    pub portal: PortalKey,
    pub target: MessageId,
    pub emoji: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingRemove {
    pub portal: PortalKey,
    pub target: MessageId,
}

// --- Backfill ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMessagesParams {
    pub portal: PortalKey,
    /// Fetch messages older than this one; `None` fetches the latest.
    pub anchor: Option<MessageId>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillMessage {
    pub converted: ConvertedMessage,
    pub sender: EventSender,
    pub id: MessageId,
    pub transaction_id: TransactionId,
    pub timestamp: DateTime<Utc>,
    pub stream_order: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchMessagesResponse {
    pub messages: Vec<BackfillMessage>,
    pub has_more: bool,
    pub forward: bool,
}

// --- Login ---

/// A login flow offered to users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginFlow {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
pub enum LoginFieldKind {
    Url,
    Token,
}

/// A value the user has to supply during login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginField {
    pub id: &'static str,
    pub name: &'static str,
    pub kind: LoginFieldKind,
    pub pattern: Option<&'static str>,
}

/// A step in a login flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginStep {
    UserInput {
        step_id: &'static str,
        instructions: String,
        fields: Vec<LoginField>,
    },
    Complete {
        step_id: &'static str,
        instructions: String,
        login_id: UserLoginId,
        remote_name: String,
        metadata: LoginMetadata,
    },
}

// --- Capabilities ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
pub enum SupportLevel {
    Unsupported,
    PartialSupport,
    FullySupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
pub enum FormattingFeature {
    Bold,
    Italic,
    Strikethrough,
    InlineCode,
    CodeBlock,
    InlineLink,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FileFeatures {
    pub mime_types: BTreeMap<&'static str, SupportLevel>,
    pub caption: Option<SupportLevel>,
}

/// Feature set of a bridged room, advertised to the framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomFeatures {
    pub id: String,
    pub formatting: BTreeMap<FormattingFeature, SupportLevel>,
    pub file: BTreeMap<String, FileFeatures>,
    pub reply: SupportLevel,
    pub edit: SupportLevel,
    pub delete: SupportLevel,
    pub reaction: SupportLevel,
    /// Maximum reactions per user; negative means unlimited.
    pub reaction_count: i32,
}

/// Network-wide capabilities, independent of any room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NetworkCapabilities {
    pub disappearing_messages: bool,
    pub aggressive_update_info: bool,
    pub create_dm_by_identifier: bool,
}
