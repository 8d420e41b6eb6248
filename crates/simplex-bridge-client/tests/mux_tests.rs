// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the chat client against a scripted WebSocket server.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::json;
use simplex_bridge_client::types::{ChatRef, ComposedMessage, MsgContent};
use simplex_bridge_client::{ChatClient, ClientConfig, EventStream};
use simplex_bridge_config::SimplexConfig;
use simplex_bridge_core::BridgeError;
use simplex_bridge_test_utils::{MockSimplexServer, Reply};

const WAIT: Duration = Duration::from_secs(5);

async fn connect(server: &MockSimplexServer, queue: usize) -> (ChatClient, EventStream) {
    let simplex = SimplexConfig {
        event_queue_capacity: queue,
        one_shot_timeout_secs: 5,
        ..Default::default()
    };
    ChatClient::connect(ClientConfig::new(server.url(), &simplex))
        .await
        .expect("client should connect to mock server")
}

fn active_user(user_id: i64) -> serde_json::Value {
    json!({
        "type": "activeUser",
        "user": {"userId": user_id, "profile": {"displayName": "bridge bot", "fullName": ""}}
    })
}

fn sent_items(item_id: i64) -> serde_json::Value {
    json!({
        "type": "newChatItems",
        "chatItems": [{
            "chatInfo": {"type": "direct", "contact": {"contactId": 42}},
            "chatItem": {
                "chatDir": {"type": "directSnd"},
                "meta": {"itemId": item_id, "createdAt": "2026-01-02T03:04:05Z"},
                "content": {"type": "sndMsgContent", "msgContent": {"type": "text", "text": "hi"}}
            }
        }]
    })
}

#[tokio::test]
async fn get_active_user_decodes_typed_result() {
    let server = MockSimplexServer::start(|cmd| match cmd {
        "/u" => Reply::Respond(active_user(1)),
        _ => Reply::Silent,
    })
    .await
    .unwrap();
    let (client, _events) = connect(&server, 64).await;

    let user = client.get_active_user().await.unwrap();
    assert_eq!(user.user_id, 1);
    assert_eq!(user.profile.display_name, "bridge bot");
}

#[tokio::test]
async fn concurrent_sends_receive_their_own_responses_out_of_order() {
    let server = MockSimplexServer::start(|cmd| match cmd {
        "/_contacts 1" => Reply::Delayed(
            Duration::from_millis(200),
            json!({"type": "contactsList", "contacts": [{"contactId": 42, "localDisplayName": "alice"}]}),
        ),
        "/u" => Reply::Respond(active_user(1)),
        _ => Reply::Silent,
    })
    .await
    .unwrap();
    let (client, _events) = connect(&server, 64).await;
    let client = Arc::new(client);

    let slow = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.list_contacts(1).await })
    };
    server.wait_for_commands(1, WAIT).await;
    let user = client.get_active_user().await.unwrap();
    assert!(!slow.is_finished(), "delayed response must not resolve the fast command's slot");

    let contacts = slow.await.unwrap().unwrap();
    assert_eq!(user.user_id, 1);
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0].contact_id, 42);
}

#[tokio::test]
async fn unmatched_corr_id_is_delivered_as_event() {
    let server = MockSimplexServer::start(|_| Reply::Silent).await.unwrap();
    let (_client, mut events) = connect(&server, 64).await;
    server.wait_for_connections(1, WAIT).await;

    server
        .push_with_corr_id("999", json!({"type": "contactConnected", "contact": {"contactId": 5}}))
        .await;

    let event = tokio::time::timeout(WAIT, events.next()).await.unwrap().unwrap();
    assert_eq!(event.event_type, "contactConnected");
    assert_eq!(event.payload["contact"]["contactId"], 5);
}

#[tokio::test]
async fn events_arrive_in_order() {
    let server = MockSimplexServer::start(|_| Reply::Silent).await.unwrap();
    let (_client, mut events) = connect(&server, 64).await;
    server.wait_for_connections(1, WAIT).await;

    for n in 0..5 {
        server.push_event(json!({"type": "contactUpdated", "seq": n})).await;
    }
    for n in 0..5 {
        let event = tokio::time::timeout(WAIT, events.next()).await.unwrap().unwrap();
        assert_eq!(event.payload["seq"], n);
    }
}

#[tokio::test]
async fn full_event_queue_drops_newest_events() {
    let server = MockSimplexServer::start(|cmd| match cmd {
        "/u" => Reply::Respond(active_user(1)),
        _ => Reply::Silent,
    })
    .await
    .unwrap();
    let (client, mut events) = connect(&server, 2).await;
    server.wait_for_connections(1, WAIT).await;

    for n in 0..5 {
        server.push_event(json!({"type": "contactUpdated", "seq": n})).await;
    }
    // The reader handles frames in order, so once this answer arrives every
    // pushed event has been routed.
    client.get_active_user().await.unwrap();

    let first = events.next().await.unwrap();
    let second = events.next().await.unwrap();
    assert_eq!(first.payload["seq"], 0);
    assert_eq!(second.payload["seq"], 1);
    assert!(
        tokio::time::timeout(Duration::from_millis(100), events.next())
            .await
            .is_err(),
        "events beyond capacity should have been dropped"
    );
}

#[tokio::test]
async fn connection_drop_fails_pending_sends_and_ends_stream() {
    let server = MockSimplexServer::start(|_| Reply::Silent).await.unwrap();
    let (client, mut events) = connect(&server, 64).await;
    let client = Arc::new(client);

    let first = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.get_active_user().await })
    };
    let second = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.list_groups(1).await })
    };
    server.wait_for_commands(2, WAIT).await;
    server.drop_connections().await;

    let first = tokio::time::timeout(WAIT, first).await.unwrap().unwrap();
    let second = tokio::time::timeout(WAIT, second).await.unwrap().unwrap();
    assert!(matches!(first, Err(BridgeError::ConnectionClosed)));
    assert!(matches!(second, Err(BridgeError::ConnectionClosed)));

    assert!(tokio::time::timeout(WAIT, events.next()).await.unwrap().is_none());
    assert!(events.next().await.is_none());

    assert!(client.is_closed().await);
    let late = client.get_active_user().await;
    assert!(matches!(late, Err(BridgeError::ConnectionClosed)));
}

#[tokio::test]
async fn retry_once_falls_back_to_one_shot_connection() {
    let sends = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&sends);
    let server = MockSimplexServer::start(move |cmd| {
        if cmd.starts_with("/_send @42") {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Reply::Drop
            } else {
                Reply::Respond(sent_items(100))
            }
        } else {
            Reply::Silent
        }
    })
    .await
    .unwrap();
    let (client, _events) = connect(&server, 64).await;

    let message = ComposedMessage::new(MsgContent::file("photo.jpg")).with_file("/tmp/photo.jpg");
    let items = client
        .send_messages_retry_once(ChatRef::direct(42), vec![message])
        .await
        .unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].chat_item.meta.item_id, 100);
    assert_eq!(sends.load(Ordering::SeqCst), 2);
    assert_eq!(server.connection_count(), 2, "retry must use a fresh connection");
}

#[tokio::test]
async fn retry_once_gives_up_after_second_transport_failure() {
    let server = MockSimplexServer::start(|_| Reply::Drop).await.unwrap();
    let (client, _events) = connect(&server, 64).await;

    let message = ComposedMessage::new(MsgContent::text("hi"));
    let err = client
        .send_messages_retry_once(ChatRef::direct(42), vec![message])
        .await
        .unwrap_err();

    assert!(err.is_transport(), "unexpected error: {err}");
    let commands = server.wait_for_commands(2, WAIT).await;
    assert_eq!(commands.len(), 2);
}

#[tokio::test]
async fn unexpected_response_type_is_not_retried() {
    let server = MockSimplexServer::start(|_| {
        Reply::Respond(json!({"type": "chatCmdError", "chatError": {"type": "error"}}))
    })
    .await
    .unwrap();
    let (client, _events) = connect(&server, 64).await;

    let message = ComposedMessage::new(MsgContent::text("hi"));
    let err = client
        .send_messages_retry_once(ChatRef::direct(42), vec![message])
        .await
        .unwrap_err();

    match err {
        BridgeError::UnexpectedResponse { expected, actual } => {
            assert_eq!(expected, "newChatItems");
            assert_eq!(actual, "chatCmdError");
        }
        other => panic!("expected UnexpectedResponse, got {other:?}"),
    }
    assert_eq!(server.received_commands().await.len(), 1);
    assert_eq!(server.connection_count(), 1);
}

#[tokio::test]
async fn send_renders_catalogue_command() {
    let server = MockSimplexServer::start(|_| Reply::Respond(sent_items(7))).await.unwrap();
    let (client, _events) = connect(&server, 64).await;

    client
        .send_messages(ChatRef::direct(42), vec![ComposedMessage::new(MsgContent::text("hi"))])
        .await
        .unwrap();

    let commands = server.received_commands().await;
    assert_eq!(
        commands,
        vec![r#"/_send @42 live=off json [{"mentions":{},"msgContent":{"type":"text","text":"hi"}}]"#.to_string()]
    );
}
