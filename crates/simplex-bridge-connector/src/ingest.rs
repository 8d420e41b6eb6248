// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event ingestion: turns chat process events into remote events for the
//! framework.
//!
//! Events are handled one at a time in arrival order. A handler never fails
//! the stream; problems are logged and the event is dropped.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use simplex_bridge_client::event::{
    ChatItemReaction, ChatItemsDeleted, ReceivedContactRequest, SimplexEvent,
};
use simplex_bridge_client::types::{AChatItem, ChatRef};
use simplex_bridge_client::{ChatClient, Event};
use simplex_bridge_core::{
    ChatInfoProvider, EventMeta, EventSender, RemoteEvent, TransactionId,
};

use crate::chatinfo::contact_user_info;
use crate::convert::{ChatItemConverter, ChatItemEditConverter, LiveChatInfo};
use crate::echo::SETTLE_GRACE;
use crate::ids;
use crate::session::LoginSession;

/// Item timestamp, or now if it does not parse.
pub fn item_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Handles one unsolicited frame.
pub async fn handle_event(session: &Arc<LoginSession>, event: Event) {
    let decoded = match SimplexEvent::decode(&event) {
        Ok(decoded) => decoded,
        Err(e) => {
            error!(event_type = %event.event_type, error = %e, "failed to decode event");
            return;
        }
    };

    match decoded {
        SimplexEvent::NewChatItems(data) => handle_new_items(session, data.chat_items).await,
        SimplexEvent::ChatItemUpdated(data) => handle_updated_item(session, data.chat_item).await,
        SimplexEvent::ChatItemsDeleted(data) => handle_deleted_items(session, data).await,
        SimplexEvent::ChatItemReaction(data) => handle_reaction(session, data).await,
        SimplexEvent::ContactConnected(data) => {
            debug!(contact_id = data.contact.contact_id, "contact connected");
            resync(session, ChatRef::direct(data.contact.contact_id), true).await;
        }
        SimplexEvent::ContactUpdated(data) => {
            let contact = data.to_contact;
            let user = ids::user_id(contact.contact_id);
            let info = contact_user_info(session, &contact);
            if let Err(e) = session.framework.update_ghost_info(&user, info).await {
                warn!(contact_id = contact.contact_id, error = %e, "failed to update ghost info");
            }
            resync(session, ChatRef::direct(contact.contact_id), false).await;
        }
        SimplexEvent::JoinedGroupMember(data)
        | SimplexEvent::DeletedMember(data)
        | SimplexEvent::LeftMember(data) => {
            resync(session, ChatRef::group(data.group_info.group_id), false).await;
        }
        SimplexEvent::GroupUpdated(data) => {
            resync(session, ChatRef::group(data.to_group.group_id), false).await;
        }
        SimplexEvent::RcvFileDescrReady(data) => {
            let file_id = data.rcv_file_transfer.file_id;
            info!(file_id, file_name = %data.rcv_file_transfer.file_name, "accepting incoming file");
            match session.current_client() {
                Ok(client) => {
                    if let Err(e) = client.receive_file(file_id).await {
                        warn!(file_id, error = %e, "failed to accept file");
                    }
                }
                Err(e) => warn!(file_id, error = %e, "cannot accept file"),
            }
        }
        SimplexEvent::RcvFileComplete(data) => {
            handle_new_items(session, vec![data.chat_item]).await;
        }
        SimplexEvent::ReceivedContactRequest(data) => handle_contact_request(session, data).await,
        SimplexEvent::ChatError(payload) => {
            warn!(payload = %payload, "simplex-chat reported an error");
        }
        SimplexEvent::Other(event_type) => {
            debug!(event_type = %event_type, "unhandled event type");
        }
    }
}

async fn handle_new_items(session: &Arc<LoginSession>, items: Vec<AChatItem>) {
    for AChatItem {
        chat_info,
        chat_item,
    } in items
    {
        let item_id = chat_item.meta.item_id;
        if chat_item.has_pending_file() {
            debug!(item_id, "file not downloaded yet, waiting for completion");
            continue;
        }
        let Some(portal_key) = ids::portal_key_for(&chat_info, session.login_id()) else {
            debug!(item_id, "skipping item in unsupported chat");
            continue;
        };

        let id = ids::message_id(item_id);
        let sent = chat_item.chat_dir.is_sent();
        if sent && session.echoes.consume_settled(&id, SETTLE_GRACE).await {
            debug!(item_id, "suppressed echo of sent message");
            continue;
        }

        let meta = EventMeta::new(portal_key)
            .sender(session.sender_for(&chat_item.chat_dir, &chat_info))
            .timestamp(item_timestamp(&chat_item.meta.created_at))
            .create_portal(true)
            .item_id(item_id);
        let transaction_id = sent.then(|| TransactionId::from(&id));
        let converter = Arc::new(ChatItemConverter::new(
            chat_item,
            Arc::clone(&session.config),
        ));
        session
            .queue(RemoteEvent::Message {
                meta,
                id,
                transaction_id,
                converter,
            })
            .await;
    }
}

async fn handle_updated_item(session: &Arc<LoginSession>, item: AChatItem) {
    let AChatItem {
        chat_info,
        chat_item,
    } = item;
    let item_id = chat_item.meta.item_id;
    let Some(portal_key) = ids::portal_key_for(&chat_info, session.login_id()) else {
        debug!(item_id, "skipping edit in unsupported chat");
        return;
    };
    let meta = EventMeta::new(portal_key)
        .sender(session.sender_for(&chat_item.chat_dir, &chat_info))
        .item_id(item_id);
    let converter = Arc::new(ChatItemEditConverter::new(
        chat_item,
        Arc::clone(&session.config),
    ));
    session
        .queue(RemoteEvent::Edit {
            meta,
            target: ids::message_id(item_id),
            converter,
        })
        .await;
}

async fn handle_deleted_items(session: &Arc<LoginSession>, data: ChatItemsDeleted) {
    for deletion in data.chat_item_deletions {
        let Some(deleted) = deletion.deleted_chat_item else {
            continue;
        };
        let item_id = deleted.chat_item.meta.item_id;
        let Some(portal_key) = ids::portal_key_for(&deleted.chat_info, session.login_id()) else {
            debug!(item_id, "skipping deletion in unsupported chat");
            continue;
        };
        let meta = EventMeta::new(portal_key)
            .sender(session.sender_for(&deleted.chat_item.chat_dir, &deleted.chat_info))
            .item_id(item_id);
        session
            .queue(RemoteEvent::MessageRemove {
                meta,
                target: ids::message_id(item_id),
            })
            .await;
    }
}

async fn handle_reaction(session: &Arc<LoginSession>, data: ChatItemReaction) {
    let reaction = data.reaction;
    let Some(portal_key) = ids::portal_key_for(&reaction.chat_info, session.login_id()) else {
        warn!("dropping reaction in unsupported chat");
        return;
    };

    let sender = if let Some(contact) = &reaction.from_contact {
        Some(EventSender::remote(ids::user_id(contact.contact_id)))
    } else if let Some(member) = &reaction.from_member {
        Some(EventSender::remote(ids::member_sender_id(member)))
    } else {
        reaction
            .chat_reaction
            .chat_dir
            .as_ref()
            .map(|dir| session.sender_for(dir, &reaction.chat_info))
    };
    let Some(sender) = sender.filter(|s| *s != EventSender::unknown()) else {
        warn!(portal = %portal_key.id, "dropping reaction without a resolvable sender");
        return;
    };

    let Some(target) = reaction.chat_reaction.chat_item.as_ref() else {
        warn!(portal = %portal_key.id, "dropping reaction without a target item");
        return;
    };
    let item_id = target.meta.item_id;

    let emoji = reaction.chat_reaction.reaction.emoji;
    if emoji.is_empty() {
        warn!(item_id, "dropping reaction without an emoji");
        return;
    }

    let timestamp = if reaction.chat_reaction.reaction_at.is_empty() {
        Utc::now()
    } else {
        item_timestamp(&reaction.chat_reaction.reaction_at)
    };
    let meta = EventMeta::new(portal_key)
        .sender(sender)
        .timestamp(timestamp)
        .item_id(item_id);
    let target = ids::message_id(item_id);
    let event = if data.added {
        RemoteEvent::Reaction {
            meta,
            target,
            emoji,
        }
    } else {
        RemoteEvent::ReactionRemove {
            meta,
            target,
            emoji,
        }
    };
    session.queue(event).await;
}

async fn handle_contact_request(session: &Arc<LoginSession>, data: ReceivedContactRequest) {
    let request = data.contact_request;
    info!(
        request_id = request.contact_request_id,
        name = %request.local_display_name,
        "accepting contact request"
    );
    let client = match session.current_client() {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "cannot accept contact request");
            return;
        }
    };
    match client.accept_contact(request.contact_request_id).await {
        Ok(contact) => resync(session, ChatRef::direct(contact.contact_id), true).await,
        Err(e) => warn!(
            request_id = request.contact_request_id,
            error = %e,
            "failed to accept contact request"
        ),
    }
}

/// Queues a resync of one chat with its full member list.
async fn resync(session: &Arc<LoginSession>, chat: ChatRef, create_portal: bool) {
    let info: Arc<dyn ChatInfoProvider> = Arc::new(LiveChatInfo::new(session, true));
    queue_resync(session, chat, create_portal, info).await;
}

async fn queue_resync(
    session: &LoginSession,
    chat: ChatRef,
    create_portal: bool,
    info: Arc<dyn ChatInfoProvider>,
) {
    let meta = EventMeta::new(session.portal_key(chat)).create_portal(create_portal);
    session.queue(RemoteEvent::ChatResync { meta, info }).await;
}

/// Resyncs every contact and group after a connect.
///
/// The first sync after login carries member lists; later ones refresh
/// metadata only, so the framework does not reconcile membership again.
pub async fn sync_chats(session: Arc<LoginSession>, client: Arc<ChatClient>) {
    let reconnect = session.metadata().await.chats_synced;
    let info: Arc<dyn ChatInfoProvider> = Arc::new(LiveChatInfo::new(&session, !reconnect));
    let user_id = session.remote_user_id;

    let contacts_listed = match client.list_contacts(user_id).await {
        Ok(contacts) => {
            debug!(count = contacts.len(), reconnect, "syncing contacts");
            for contact in contacts {
                queue_resync(&session, ChatRef::direct(contact.contact_id), true, Arc::clone(&info))
                    .await;
            }
            true
        }
        Err(e) => {
            error!(error = %e, "failed to list contacts");
            false
        }
    };

    let groups_listed = match client.list_groups(user_id).await {
        Ok(groups) => {
            debug!(count = groups.len(), reconnect, "syncing groups");
            for group in groups {
                queue_resync(&session, ChatRef::group(group.group_id), true, Arc::clone(&info)).await;
            }
            true
        }
        Err(e) => {
            error!(error = %e, "failed to list groups");
            false
        }
    };

    // A partial first sync is retried in full on the next connect.
    if !reconnect && contacts_listed && groups_listed {
        if let Err(e) = session.update_metadata(|m| m.chats_synced = true).await {
            warn!(error = %e, "failed to save chats_synced flag");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use simplex_bridge_config::model::BridgeConfig;
    use simplex_bridge_core::{LoginMetadata, MessageId, RemoteEventKind, UserId, UserLoginId};
    use simplex_bridge_test_utils::MockFramework;
    use tracing_test::traced_test;

    use crate::preview::LinkPreviewer;

    fn session(fw: &Arc<MockFramework>) -> Arc<LoginSession> {
        Arc::new(
            LoginSession::new(
                Arc::new(BridgeConfig::default()),
                fw.clone(),
                UserLoginId::from("1"),
                LoginMetadata::default(),
                Arc::new(LinkPreviewer::new(false).unwrap()),
            )
            .unwrap(),
        )
    }

    fn event(payload: Value) -> Event {
        Event {
            event_type: payload["type"].as_str().unwrap().to_string(),
            payload,
        }
    }

    fn new_item(item_id: i64, dir: &str, file: Option<Value>) -> Event {
        let mut item = json!({
            "chatDir": {"type": dir},
            "meta": {"itemId": item_id, "createdAt": "2024-05-01T10:00:00Z", "itemText": "hi"},
            "content": {"type": "rcvMsgContent", "msgContent": {"type": "text", "text": "hi"}}
        });
        if let Some(file) = file {
            item["file"] = file;
        }
        event(json!({
            "type": "newChatItems",
            "chatItems": [{
                "chatInfo": {"type": "direct", "contact": {"contactId": 42}},
                "chatItem": item
            }]
        }))
    }

    #[tokio::test]
    async fn new_received_item_is_queued() {
        let fw = Arc::new(MockFramework::new());
        let session = session(&fw);
        handle_event(&session, new_item(100, "directRcv", None)).await;

        let events = fw.events().await;
        assert_eq!(events.len(), 1);
        let RemoteEvent::Message {
            meta,
            id,
            transaction_id,
            ..
        } = &events[0]
        else {
            panic!("expected message, got {:?}", events[0]);
        };
        assert_eq!(id, &MessageId::from("100"));
        assert_eq!(meta.portal_key.id.as_str(), "d:42");
        assert_eq!(meta.sender.as_ref().unwrap().sender, UserId::from("42"));
        assert!(meta.create_portal);
        assert_eq!(meta.timestamp.to_rfc3339(), "2024-05-01T10:00:00+00:00");
        assert!(transaction_id.is_none());
    }

    #[tokio::test]
    async fn own_items_carry_transaction_id_unless_echoed() {
        let fw = Arc::new(MockFramework::new());
        let session = session(&fw);
        session.echoes.record(MessageId::from("100"));

        handle_event(&session, new_item(100, "directSnd", None)).await;
        handle_event(&session, new_item(101, "directSnd", None)).await;

        let events = fw.events().await;
        assert_eq!(events.len(), 1);
        let RemoteEvent::Message {
            meta,
            id,
            transaction_id,
            ..
        } = &events[0]
        else {
            panic!("expected message");
        };
        assert_eq!(id, &MessageId::from("101"));
        assert_eq!(transaction_id.as_ref().unwrap().as_str(), "101");
        assert!(meta.sender.as_ref().unwrap().is_from_me);
    }

    #[tokio::test]
    async fn pending_file_waits_for_completion() {
        let fw = Arc::new(MockFramework::new());
        let session = session(&fw);
        let file = json!({"fileId": 3, "fileName": "a.jpg", "fileSize": 10});
        handle_event(&session, new_item(7, "directRcv", Some(file))).await;
        assert!(fw.events().await.is_empty());

        handle_event(
            &session,
            event(json!({
                "type": "rcvFileComplete",
                "chatItem": {
                    "chatInfo": {"type": "direct", "contact": {"contactId": 42}},
                    "chatItem": {
                        "chatDir": {"type": "directRcv"},
                        "meta": {"itemId": 7},
                        "file": {"fileId": 3, "fileName": "a.jpg", "fileSize": 10, "filePath": "a.jpg"}
                    }
                }
            })),
        )
        .await;
        let events = fw.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message_id(), Some(&MessageId::from("7")));
    }

    #[tokio::test]
    async fn edits_and_deletions_target_item() {
        let fw = Arc::new(MockFramework::new());
        let session = session(&fw);
        let chat_item = json!({
            "chatInfo": {"type": "group", "groupInfo": {"groupId": 9}},
            "chatItem": {
                "chatDir": {"type": "groupRcv", "groupMember": {"memberId": "YQ=="}},
                "meta": {"itemId": 55, "itemText": "changed"}
            }
        });
        handle_event(
            &session,
            event(json!({"type": "chatItemUpdated", "chatItem": chat_item.clone()})),
        )
        .await;
        handle_event(
            &session,
            event(json!({
                "type": "chatItemsDeleted",
                "chatItemDeletions": [
                    {"deletedChatItem": chat_item, "toChatItem": null},
                    {"deletedChatItem": null}
                ],
                "byUser": false
            })),
        )
        .await;

        let events = fw.events().await;
        let kinds: Vec<_> = events.iter().map(RemoteEvent::kind).collect();
        assert_eq!(kinds, vec![RemoteEventKind::Edit, RemoteEventKind::MessageRemove]);
        for e in &events {
            assert_eq!(e.message_id(), Some(&MessageId::from("55")));
            assert_eq!(e.meta().portal_key.id.as_str(), "g:9");
            assert!(!e.meta().create_portal);
            assert_eq!(e.meta().sender.as_ref().unwrap().sender, UserId::from("m:YQ=="));
        }
    }

    fn reaction(added: bool, body: Value) -> Event {
        event(json!({"type": "chatItemReaction", "added": added, "reaction": body}))
    }

    #[tokio::test]
    async fn reactions_resolve_sender_and_target() {
        let fw = Arc::new(MockFramework::new());
        let session = session(&fw);
        handle_event(
            &session,
            reaction(
                true,
                json!({
                    "chatInfo": {"type": "direct", "contact": {"contactId": 42}},
                    "chatReaction": {
                        "chatDir": {"type": "directRcv"},
                        "chatItem": {"meta": {"itemId": 12}},
                        "reaction": {"type": "emoji", "emoji": "👍"},
                        "reactionAt": "2024-05-01T10:00:00Z"
                    }
                }),
            ),
        )
        .await;
        handle_event(
            &session,
            reaction(
                false,
                json!({
                    "chatInfo": {"type": "group", "groupInfo": {"groupId": 9}},
                    "fromMember": {"memberId": "Yg==", "contactId": 8},
                    "chatReaction": {
                        "chatItem": {"meta": {"itemId": 13}},
                        "reaction": {"type": "emoji", "emoji": "❤"}
                    }
                }),
            ),
        )
        .await;

        let events = fw.events().await;
        assert_eq!(events.len(), 2);
        match &events[0] {
            RemoteEvent::Reaction {
                meta,
                target,
                emoji,
            } => {
                assert_eq!(target, &MessageId::from("12"));
                assert_eq!(emoji, "👍");
                assert_eq!(meta.sender.as_ref().unwrap().sender, UserId::from("42"));
            }
            other => panic!("expected reaction, got {other:?}"),
        }
        match &events[1] {
            RemoteEvent::ReactionRemove { meta, target, .. } => {
                assert_eq!(target, &MessageId::from("13"));
                assert_eq!(meta.sender.as_ref().unwrap().sender, UserId::from("8"));
            }
            other => panic!("expected reaction removal, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unresolvable_reactions_are_dropped() {
        let fw = Arc::new(MockFramework::new());
        let session = session(&fw);
        // No sender information at all.
        handle_event(
            &session,
            reaction(
                true,
                json!({
                    "chatInfo": {"type": "direct", "contact": {"contactId": 42}},
                    "chatReaction": {
                        "chatItem": {"meta": {"itemId": 12}},
                        "reaction": {"type": "emoji", "emoji": "👍"}
                    }
                }),
            ),
        )
        .await;
        // No target item.
        handle_event(
            &session,
            reaction(
                true,
                json!({
                    "chatInfo": {"type": "direct", "contact": {"contactId": 42}},
                    "fromContact": {"contactId": 42},
                    "chatReaction": {"reaction": {"type": "emoji", "emoji": "👍"}}
                }),
            ),
        )
        .await;
        assert!(fw.events().await.is_empty());
    }

    #[tokio::test]
    #[traced_test]
    async fn bad_and_unknown_events_are_isolated() {
        let fw = Arc::new(MockFramework::new());
        let session = session(&fw);
        handle_event(&session, event(json!({"type": "chatItemUpdated"}))).await;
        handle_event(&session, event(json!({"type": "sndFileProgressXFTP"}))).await;
        handle_event(&session, event(json!({"type": "chatError", "chatError": {"type": "error"}}))).await;
        handle_event(&session, new_item(1, "directRcv", None)).await;
        assert_eq!(fw.events().await.len(), 1);
        assert!(logs_contain("failed to decode event"));
        assert!(logs_contain("simplex-chat reported an error"));
        assert!(logs_contain("unhandled event type"));
    }

    #[tokio::test]
    async fn membership_changes_resync_group_without_creating() {
        let fw = Arc::new(MockFramework::new());
        let session = session(&fw);
        handle_event(
            &session,
            event(json!({"type": "leftMember", "groupInfo": {"groupId": 4}, "member": {"memberId": "YQ=="}})),
        )
        .await;
        handle_event(
            &session,
            event(json!({"type": "contactConnected", "contact": {"contactId": 6}})),
        )
        .await;
        let events = fw.events().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind(), RemoteEventKind::ChatResync);
        assert_eq!(events[0].meta().portal_key.id.as_str(), "g:4");
        assert!(!events[0].meta().create_portal);
        assert_eq!(events[1].meta().portal_key.id.as_str(), "d:6");
        assert!(events[1].meta().create_portal);
    }

    #[tokio::test]
    async fn contact_update_pushes_ghost_info() {
        let fw = Arc::new(MockFramework::new());
        let session = session(&fw);
        handle_event(
            &session,
            event(json!({
                "type": "contactUpdated",
                "fromContact": {"contactId": 6},
                "toContact": {"contactId": 6, "profile": {"displayName": "Carol"}}
            })),
        )
        .await;
        let ghosts = fw.ghost_updates().await;
        assert_eq!(ghosts.len(), 1);
        assert_eq!(ghosts[0].0, UserId::from("6"));
        assert_eq!(ghosts[0].1.name.as_deref(), Some("Carol (SimpleX)"));
        assert_eq!(ghosts[0].1.is_bot, Some(false));

        let events = fw.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), RemoteEventKind::ChatResync);
        assert_eq!(events[0].meta().portal_key.id.as_str(), "d:6");
        assert!(!events[0].meta().create_portal);
    }

    #[test]
    fn bad_timestamps_fall_back_to_now() {
        let before = Utc::now();
        assert!(item_timestamp("yesterday") >= before);
        assert_eq!(
            item_timestamp("2024-05-01T10:00:00.123Z").timestamp_millis(),
            1_714_557_600_123
        );
    }
}
