// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-command exchange over a disposable connection.
//!
//! The chat process may drop its persistent connection while handling a large
//! file send. This path dials a fresh socket, writes one command, reads until
//! the frame carrying its own correlation id (discarding everything else),
//! and closes. It never retries.

use futures::{SinkExt, StreamExt};
use simplex_bridge_core::BridgeError;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

use crate::transport::{ClientConfig, WsStream, dial};
use crate::wire::{CommandFrame, CorrIdGen, Response, ResponseFrame};

/// Runs one command on a fresh connection, bounded by the one-shot timeout.
pub async fn send_once(config: &ClientConfig, corr_ids: &CorrIdGen, cmd: &str) -> Result<Response, BridgeError> {
    tokio::time::timeout(config.one_shot_timeout, exchange(config, corr_ids, cmd))
        .await
        .map_err(|_| BridgeError::Timeout {
            duration: config.one_shot_timeout,
        })?
}

async fn exchange(config: &ClientConfig, corr_ids: &CorrIdGen, cmd: &str) -> Result<Response, BridgeError> {
    let mut ws = dial(config).await?;
    let corr_id = corr_ids.next_id();
    let frame = CommandFrame {
        corr_id: &corr_id,
        cmd,
    }
    .to_json()?;
    ws.send(Message::text(frame))
        .await
        .map_err(|e| BridgeError::transport("failed to write one-shot command", e))?;

    let result = read_until(&mut ws, &corr_id).await;
    if let Err(e) = ws.close(None).await {
        debug!(error = %e, "one-shot close failed");
    }
    result
}

async fn read_until(ws: &mut WsStream, corr_id: &str) -> Result<Response, BridgeError> {
    loop {
        let text = match ws.next().await {
            Some(Ok(Message::Text(text))) => text.as_str().to_owned(),
            Some(Ok(Message::Close(_))) | None => return Err(BridgeError::ConnectionClosed),
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(BridgeError::transport("one-shot read error", e)),
        };
        let Ok(frame) = ResponseFrame::parse(&text) else {
            continue;
        };
        if frame.corr_id.as_deref() != Some(corr_id) {
            debug!(corr_id = ?frame.corr_id, "one-shot discarding unrelated frame");
            continue;
        }
        return Response::from_payload(frame.resp.unwrap_or_default());
    }
}
