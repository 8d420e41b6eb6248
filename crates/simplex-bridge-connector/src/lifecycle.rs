// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection lifecycle: dial, back off, reconnect, and feed the event
//! stream into ingestion.
//!
//! The loop runs until its [`CancellationToken`] is cancelled. Dial failures
//! are retried forever, since the chat process may simply not be up yet.

use std::sync::Arc;
use std::time::Duration;

use strum::Display;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use simplex_bridge_client::{ChatClient, ClientConfig, EventStream};
use simplex_bridge_core::{BridgeState, BridgeStateEvent};

use crate::ingest;
use crate::session::LoginSession;

/// Where the lifecycle loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Delay before retry number `attempt + 1`: `2 << attempt` seconds, capped.
pub fn backoff_delay(attempt: u32, max: Duration) -> Duration {
    Duration::from_secs(2u64 << attempt.min(8)).min(max)
}

enum StreamEnd {
    Closed,
    Cancelled,
}

/// Runs the lifecycle for one login until `cancel` fires.
pub async fn run(session: Arc<LoginSession>, ws_url: String, cancel: CancellationToken) {
    let max_backoff = session.config.simplex.max_backoff();
    let mut attempt: u32 = 0;

    loop {
        if attempt == 0 {
            session.set_state(ConnectionState::Connecting);
            report(&session, BridgeState::new(BridgeStateEvent::Connecting)).await;
        }

        let config = ClientConfig::new(ws_url.clone(), &session.config.simplex);
        let dialed = tokio::select! {
            _ = cancel.cancelled() => break,
            dialed = ChatClient::connect(config) => dialed,
        };

        let (client, events) = match dialed {
            Ok(connected) => connected,
            Err(e) => {
                error!(ws_url = %ws_url, error = %e, "failed to connect to simplex-chat");
                report(
                    &session,
                    BridgeState::new(BridgeStateEvent::TransientDisconnect)
                        .with_error("websocket-connect-error", e.to_string()),
                )
                .await;
                let delay = backoff_delay(attempt, max_backoff);
                debug!(attempt, retry_in_secs = delay.as_secs(), "retrying connection");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
                attempt = attempt.saturating_add(1);
                continue;
            }
        };

        let client = Arc::new(client);
        if let Some(previous) = session.client.swap(Some(Arc::clone(&client))) {
            previous.close().await;
        }
        session.set_state(ConnectionState::Connected);
        report(&session, BridgeState::new(BridgeStateEvent::Connected)).await;
        info!(ws_url = %ws_url, "connected to simplex-chat");

        let sync_session = Arc::clone(&session);
        let sync_cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = sync_cancel.cancelled() => {}
                _ = ingest::sync_chats(sync_session, client) => {}
            }
        });

        match consume_events(&session, events, &cancel).await {
            StreamEnd::Cancelled => break,
            StreamEnd::Closed => {
                info!("simplex-chat event stream closed, reconnecting");
                report(
                    &session,
                    BridgeState::new(BridgeStateEvent::TransientDisconnect)
                        .with_error("websocket-closed", "WebSocket connection closed"),
                )
                .await;
                attempt = 0;
            }
        }
    }

    session.set_state(ConnectionState::Disconnected);
    debug!(login_id = %session.login_id, "connection lifecycle stopped");
}

/// Hands events to ingestion one at a time, in arrival order.
async fn consume_events(
    session: &Arc<LoginSession>,
    mut events: EventStream,
    cancel: &CancellationToken,
) -> StreamEnd {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => return StreamEnd::Cancelled,
            event = events.next() => event,
        };
        let Some(event) = event else {
            return StreamEnd::Closed;
        };
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return StreamEnd::Cancelled,
            _ = ingest::handle_event(session, event) => {}
        }
    }
}

async fn report(session: &LoginSession, state: BridgeState) {
    session.framework.send_bridge_state(state).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAP: Duration = Duration::from_secs(150);

    #[test]
    fn backoff_doubles_from_two_seconds() {
        assert_eq!(backoff_delay(0, CAP), Duration::from_secs(2));
        assert_eq!(backoff_delay(1, CAP), Duration::from_secs(4));
        assert_eq!(backoff_delay(2, CAP), Duration::from_secs(8));
        assert_eq!(backoff_delay(6, CAP), Duration::from_secs(128));
    }

    #[test]
    fn backoff_is_capped() {
        assert_eq!(backoff_delay(7, CAP), CAP);
        assert_eq!(backoff_delay(u32::MAX, CAP), CAP);
        assert_eq!(backoff_delay(3, Duration::from_secs(5)), Duration::from_secs(5));
    }

    #[test]
    fn state_display() {
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
    }
}
