// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket dialing with the size limits the chat API needs.

use std::time::Duration;

use simplex_bridge_config::SimplexConfig;
use simplex_bridge_core::BridgeError;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async_with_config};
use tracing::debug;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection parameters for one chat process endpoint.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub ws_url: String,
    /// Upper bound for one message or frame; media arrives base64-encoded.
    pub max_message_size: usize,
    pub event_queue_capacity: usize,
    pub dial_timeout: Duration,
    pub one_shot_timeout: Duration,
}

impl ClientConfig {
    pub fn new(ws_url: impl Into<String>, simplex: &SimplexConfig) -> Self {
        Self {
            ws_url: ws_url.into(),
            max_message_size: simplex.max_message_size,
            event_queue_capacity: simplex.event_queue_capacity,
            dial_timeout: simplex.dial_timeout(),
            one_shot_timeout: simplex.one_shot_timeout(),
        }
    }

    fn ws_config(&self) -> WebSocketConfig {
        WebSocketConfig::default()
            .max_message_size(Some(self.max_message_size))
            .max_frame_size(Some(self.max_message_size))
    }
}

/// Opens a WebSocket to the configured endpoint within the dial timeout.
pub async fn dial(config: &ClientConfig) -> Result<WsStream, BridgeError> {
    debug!(url = %config.ws_url, "dialing chat process");
    let connect = connect_async_with_config(config.ws_url.as_str(), Some(config.ws_config()), false);
    let (ws, _response) = tokio::time::timeout(config.dial_timeout, connect)
        .await
        .map_err(|_| BridgeError::Timeout {
            duration: config.dial_timeout,
        })?
        .map_err(|e| BridgeError::transport(format!("failed to dial {}", config.ws_url), e))?;
    debug!(url = %config.ws_url, "websocket connected");
    Ok(ws)
}
