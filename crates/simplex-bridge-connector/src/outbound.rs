// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound sends: framework messages, edits, reactions, and deletions.

use chrono::Utc;
use tracing::debug;

use simplex_bridge_client::types::{ComposedMessage, DeleteMode, MsgContent};
use simplex_bridge_core::types::{
    MessageResponse, MessageType, OutgoingEdit, OutgoingMessage, OutgoingReaction, OutgoingRemove,
};
use simplex_bridge_core::{BridgeError, MessageId, TransactionId};

use crate::ids;
use crate::media;
use crate::msgconv::outgoing_text;
use crate::session::LoginSession;

/// Emoji the chat process accepts as reactions.
pub const SUPPORTED_REACTIONS: [&str; 8] = ["👍", "👎", "😀", "😂", "😢", "❤", "🚀", "✅"];

/// Canonical form of a supported reaction emoji.
///
/// Variation selectors are ignored, so `❤️` and `❤` both map to `❤`.
pub fn normalize_emoji(emoji: &str) -> Option<&'static str> {
    let base = emoji.trim_end_matches('\u{fe0f}');
    SUPPORTED_REACTIONS.iter().copied().find(|r| *r == base)
}

/// Item ID a reply quotes. A reply target that is not an item ID is sent
/// as a plain message.
fn quoted_item_id(reply_to: &MessageId) -> Option<i64> {
    match ids::parse_message_id(reply_to) {
        Ok(item_id) => Some(item_id),
        Err(e) => {
            debug!(reply_to = %reply_to, error = %e, "ignoring malformed reply target");
            None
        }
    }
}

/// Sends a message and records its echo.
///
/// Media goes through the file-bearing path, which retries once on a
/// fresh connection after a transport failure.
pub async fn send_message(
    session: &LoginSession,
    msg: OutgoingMessage,
) -> Result<MessageResponse, BridgeError> {
    let chat = ids::parse_portal_id(&msg.portal.id)?;
    let client = session.current_client()?;
    let quoted = msg.reply_to.as_ref().and_then(quoted_item_id);

    let items = if msg.content.msg_type.is_media() {
        let prepared = media::prepare_outgoing(
            session.framework.as_ref(),
            &session.config.bridge,
            &msg.content,
        )
        .await
        .map_err(BridgeError::send_failed)?;
        let composed = ComposedMessage::new(prepared.content.clone())
            .with_file(prepared.path.to_string_lossy())
            .quoting(quoted);
        let guard = session.echoes.begin_send();
        let sent = client.send_messages_retry_once(chat, vec![composed]).await;
        drop(prepared);
        sent.map(|items| (items, guard))
    } else {
        let mut content = outgoing_text(&msg.content);
        if msg.content.msg_type == MessageType::Text {
            if let Some(preview) = session.previews.preview_for_text(&msg.content.body).await {
                content = MsgContent::link(msg.content.body.clone(), preview);
            }
        }
        let composed = ComposedMessage::new(content).quoting(quoted);
        let guard = session.echoes.begin_send();
        client
            .send_messages(chat, vec![composed])
            .await
            .map(|items| (items, guard))
    };
    let (items, guard) = items.map_err(BridgeError::send_failed)?;

    let item = items.first().ok_or_else(|| {
        BridgeError::send_failed(BridgeError::Protocol(
            "no chat items returned after send".into(),
        ))
    })?;
    let id = ids::message_id(item.chat_item.meta.item_id);
    guard.complete(id.clone());
    debug!(chat = %chat, message_id = %id, "sent message");

    Ok(MessageResponse {
        remove_pending: TransactionId::from(&id),
        id,
        sender: session.self_user_id(),
        timestamp: Utc::now(),
    })
}

pub async fn send_edit(session: &LoginSession, edit: OutgoingEdit) -> Result<(), BridgeError> {
    let chat = ids::parse_portal_id(&edit.portal.id)?;
    let item_id = ids::parse_message_id(&edit.target)?;
    let client = session.current_client()?;
    client
        .update_chat_item(chat, item_id, outgoing_text(&edit.content))
        .await
        .map(drop)
        .map_err(BridgeError::send_failed)
}

/// Adds or removes a reaction. Unsupported emoji are ignored.
pub async fn send_reaction(
    session: &LoginSession,
    reaction: OutgoingReaction,
    add: bool,
) -> Result<(), BridgeError> {
    let Some(emoji) = normalize_emoji(&reaction.emoji) else {
        debug!(emoji = %reaction.emoji, "ignoring unsupported reaction");
        return Ok(());
    };
    let chat = ids::parse_portal_id(&reaction.portal.id)?;
    let item_id = ids::parse_message_id(&reaction.target)?;
    let client = session.current_client()?;
    client.react_to_chat_item(chat, item_id, emoji, add).await
}

pub async fn send_remove(session: &LoginSession, remove: OutgoingRemove) -> Result<(), BridgeError> {
    let chat = ids::parse_portal_id(&remove.portal.id)?;
    let item_id = ids::parse_message_id(&remove.target)?;
    let client = session.current_client()?;
    client
        .delete_chat_item(chat, item_id, DeleteMode::Broadcast)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    #[traced_test]
    fn malformed_reply_target_is_logged_and_dropped() {
        assert_eq!(quoted_item_id(&MessageId::from("17")), Some(17));
        assert!(!logs_contain("ignoring malformed reply target"));

        assert_eq!(quoted_item_id(&MessageId::from("abc")), None);
        assert_eq!(quoted_item_id(&MessageId::from("017")), None);
        assert!(logs_contain("ignoring malformed reply target"));
        assert!(logs_contain("reply_to=abc"));
    }

    #[test]
    fn supported_emoji_normalize_to_single_form() {
        assert_eq!(normalize_emoji("👍"), Some("👍"));
        assert_eq!(normalize_emoji("👍\u{fe0f}"), Some("👍"));
        assert_eq!(normalize_emoji("❤\u{fe0f}"), Some("❤"));
        assert_eq!(normalize_emoji("✅\u{fe0f}"), Some("✅"));
        for emoji in SUPPORTED_REACTIONS {
            assert_eq!(normalize_emoji(emoji), Some(emoji));
        }
    }

    #[test]
    fn unsupported_emoji_are_rejected() {
        assert_eq!(normalize_emoji("🎉"), None);
        assert_eq!(normalize_emoji(""), None);
        assert_eq!(normalize_emoji("👍👍"), None);
        assert_eq!(normalize_emoji("+1"), None);
    }
}
