// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request/response multiplexing over one WebSocket.
//!
//! A single reader task owns the receive half. Each [`Multiplexer::send`]
//! registers a one-shot slot under a fresh correlation id before writing its
//! frame; the reader resolves the slot when a frame with that id arrives.
//! Frames without a registered id go to a bounded event queue.
//!
//! Teardown happens only in the reader: on read failure it marks the table
//! closed and takes every slot under the same lock, so a slot is resolved at
//! most once and no send can register after teardown. Dropping the taken
//! senders wakes their callers with [`BridgeError::ConnectionClosed`];
//! dropping the event sender ends the event stream.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use simplex_bridge_core::BridgeError;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::transport::WsStream;
use crate::wire::{CommandFrame, CorrIdGen, Event, Response, ResponseFrame, payload_type, preview};

type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

#[derive(Default)]
struct PendingTable {
    closed: bool,
    slots: HashMap<String, oneshot::Sender<Value>>,
}

/// Receiving half of the event queue.
///
/// Yields events in arrival order and returns `None` once the connection
/// has been torn down.
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::Receiver<Event>,
}

impl EventStream {
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

pub struct Multiplexer {
    sink: Mutex<WsSink>,
    pending: Arc<Mutex<PendingTable>>,
    corr_ids: CorrIdGen,
    reader: JoinHandle<()>,
}

impl Multiplexer {
    /// Takes ownership of a connected socket and starts the reader task.
    pub fn start(ws: WsStream, corr_ids: CorrIdGen, event_capacity: usize) -> (Self, EventStream) {
        let (sink, source) = ws.split();
        let (tx, rx) = mpsc::channel(event_capacity.max(1));
        let pending = Arc::new(Mutex::new(PendingTable::default()));
        let reader = tokio::spawn(read_loop(source, Arc::clone(&pending), tx));
        let mux = Self {
            sink: Mutex::new(sink),
            pending,
            corr_ids,
            reader,
        };
        (mux, EventStream { rx })
    }

    /// Sends one command and waits for the response carrying its correlation id.
    ///
    /// There is no timeout: the call ends when the response arrives or the
    /// connection is torn down.
    pub async fn send(&self, cmd: &str) -> Result<Response, BridgeError> {
        let corr_id = self.corr_ids.next_id();
        let (tx, rx) = oneshot::channel();
        {
            let mut table = self.pending.lock().await;
            if table.closed {
                return Err(BridgeError::ConnectionClosed);
            }
            table.slots.insert(corr_id.clone(), tx);
        }

        let frame = CommandFrame {
            corr_id: &corr_id,
            cmd,
        };
        let write = match frame.to_json() {
            Ok(json) => self
                .sink
                .lock()
                .await
                .send(Message::text(json))
                .await
                .map_err(|e| BridgeError::transport("failed to write command", e)),
            Err(e) => Err(e),
        };
        if let Err(e) = write {
            self.pending.lock().await.slots.remove(&corr_id);
            return Err(e);
        }

        let payload = rx.await.map_err(|_| BridgeError::ConnectionClosed)?;
        Response::from_payload(payload)
    }

    pub async fn is_closed(&self) -> bool {
        self.pending.lock().await.closed
    }

    /// Sends a close frame. The reader observes the close and tears down.
    pub async fn close(&self) {
        if let Err(e) = self.sink.lock().await.close().await {
            debug!(error = %e, "websocket close failed");
        }
    }
}

impl Drop for Multiplexer {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_loop(mut source: WsSource, pending: Arc<Mutex<PendingTable>>, events: mpsc::Sender<Event>) {
    loop {
        let text = match source.next().await {
            Some(Ok(Message::Text(text))) => text.as_str().to_owned(),
            Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                Ok(text) => text.to_owned(),
                Err(e) => {
                    warn!(error = %e, "dropping non-UTF-8 binary frame");
                    continue;
                }
            },
            Some(Ok(Message::Close(frame))) => {
                info!(?frame, "websocket closed by peer");
                break;
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                error!(error = %e, "websocket read error");
                break;
            }
            None => {
                info!("websocket stream ended");
                break;
            }
        };
        route_frame(&text, &pending, &events).await;
    }

    let abandoned = {
        let mut table = pending.lock().await;
        table.closed = true;
        std::mem::take(&mut table.slots)
    };
    if !abandoned.is_empty() {
        warn!(count = abandoned.len(), "failing pending commands: connection closed");
    }
    drop(abandoned);
    drop(events);
}

async fn route_frame(text: &str, pending: &Mutex<PendingTable>, events: &mpsc::Sender<Event>) {
    let frame = match ResponseFrame::parse(text) {
        Ok(frame) => frame,
        Err(e) => {
            error!(error = %e, "skipping malformed frame");
            return;
        }
    };
    let payload = frame.resp.unwrap_or(Value::Null);

    if let Some(corr_id) = frame.corr_id.as_deref() {
        let slot = pending.lock().await.slots.remove(corr_id);
        if let Some(slot) = slot {
            debug!(corr_id, resp_preview = %preview(&payload), "routing response to pending command");
            if slot.send(payload).is_err() {
                debug!(corr_id, "caller stopped waiting for response");
            }
            return;
        }
        debug!(
            corr_id,
            event_type = payload_type(&payload).unwrap_or_default(),
            resp_preview = %preview(&payload),
            "response without pending command, treating as event"
        );
    }

    let Some(event_type) = payload_type(&payload).map(str::to_owned) else {
        warn!(resp_preview = %preview(&payload), "event has no type");
        return;
    };
    debug!(event_type = %event_type, "received event");
    match events.try_send(Event {
        event_type,
        payload,
    }) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(dropped)) => {
            warn!(event_type = %dropped.event_type, "event queue full, dropping event");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {}
    }
}
