// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! History backfill through `/_get chat`.

use simplex_bridge_client::types::{AChat, ChatPagination};
use simplex_bridge_core::types::{BackfillMessage, FetchMessagesParams, FetchMessagesResponse};
use simplex_bridge_core::{BridgeError, TransactionId};
use tracing::debug;

use crate::ids;
use crate::ingest::item_timestamp;
use crate::msgconv::convert_chat_item;
use crate::session::LoginSession;

/// Page selection for a fetch: older than the anchor, else the latest.
pub fn pagination(params: &FetchMessagesParams) -> Result<ChatPagination, BridgeError> {
    let count = u32::try_from(params.count).unwrap_or(u32::MAX);
    Ok(match &params.anchor {
        Some(anchor) => ChatPagination::Before {
            item_id: ids::parse_message_id(anchor)?,
            count,
        },
        None => ChatPagination::Last { count },
    })
}

pub async fn fetch_messages(
    session: &LoginSession,
    params: FetchMessagesParams,
) -> Result<FetchMessagesResponse, BridgeError> {
    let chat = ids::parse_portal_id(&params.portal.id)?;
    let pagination = pagination(&params)?;
    let client = session.current_client()?;
    let history = client.get_chat(chat, pagination).await?;
    debug!(chat = %chat, %pagination, fetched = history.chat_items.len(), "fetched history");
    Ok(convert_history(session, history, params.count))
}

/// Converts a fetched page, oldest first.
///
/// Attachments are not uploaded here; their paths are resolved so the
/// framework can upload them when it stores the message.
pub fn convert_history(session: &LoginSession, history: AChat, count: usize) -> FetchMessagesResponse {
    let has_more = history.chat_items.len() >= count;
    let messages = history
        .chat_items
        .iter()
        .map(|item| {
            let mut converted = convert_chat_item(item);
            for part in &mut converted.parts {
                if let Some(raw) = part.pending_file.take() {
                    let resolved = session.config.bridge.resolve_file_path(&raw);
                    part.pending_file = Some(resolved.to_string_lossy().into_owned());
                }
            }
            let id = ids::message_id(item.meta.item_id);
            let timestamp = item_timestamp(&item.meta.created_at);
            BackfillMessage {
                converted,
                sender: session.sender_for(&item.chat_dir, &history.chat_info),
                transaction_id: TransactionId::from(&id),
                id,
                timestamp,
                stream_order: timestamp.timestamp_millis(),
            }
        })
        .collect();
    FetchMessagesResponse {
        messages,
        has_more,
        forward: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;
    use simplex_bridge_config::model::BridgeConfig;
    use simplex_bridge_core::{LoginMetadata, MessageId, PortalId, PortalKey, UserId, UserLoginId};
    use simplex_bridge_test_utils::MockFramework;

    use crate::preview::LinkPreviewer;

    fn params(anchor: Option<&str>, count: usize) -> FetchMessagesParams {
        FetchMessagesParams {
            portal: PortalKey {
                id: PortalId::from("d:42"),
                receiver: UserLoginId::from("1"),
            },
            anchor: anchor.map(MessageId::from),
            count,
        }
    }

    #[test]
    fn pagination_uses_anchor() {
        assert_eq!(
            pagination(&params(Some("90"), 20)).unwrap(),
            ChatPagination::Before {
                item_id: 90,
                count: 20
            }
        );
        assert_eq!(
            pagination(&params(None, 50)).unwrap(),
            ChatPagination::Last { count: 50 }
        );
        assert!(pagination(&params(Some("x"), 5)).is_err());
    }

    #[test]
    fn history_converts_senders_and_paths() {
        let mut config = BridgeConfig::default();
        config.bridge.files_folder = Some("/srv/files".into());
        let session = LoginSession::new(
            Arc::new(config),
            Arc::new(MockFramework::new()),
            UserLoginId::from("1"),
            LoginMetadata::default(),
            Arc::new(LinkPreviewer::new(false).unwrap()),
        )
        .unwrap();

        let history: AChat = serde_json::from_value(json!({
            "chatInfo": {"type": "direct", "contact": {"contactId": 42}},
            "chatItems": [
                {
                    "chatDir": {"type": "directRcv"},
                    "meta": {"itemId": 10, "createdAt": "2024-05-01T10:00:00Z", "itemText": "hello"}
                },
                {
                    "chatDir": {"type": "directSnd"},
                    "meta": {"itemId": 11, "createdAt": "2024-05-01T10:01:00Z", "itemText": ""},
                    "file": {"fileId": 2, "fileName": "a.png", "fileSize": 3, "filePath": "a.png"}
                }
            ]
        }))
        .unwrap();

        let page = convert_history(&session, history, 2);
        assert!(page.has_more);
        assert!(!page.forward);
        assert_eq!(page.messages.len(), 2);

        let first = &page.messages[0];
        assert_eq!(first.sender.sender, UserId::from("42"));
        assert_eq!(first.transaction_id.as_str(), "10");
        assert_eq!(first.stream_order, first.timestamp.timestamp_millis());

        let second = &page.messages[1];
        assert!(second.sender.is_from_me);
        assert_eq!(
            second.converted.parts[0].pending_file.as_deref(),
            Some("/srv/files/a.png")
        );
    }
}
