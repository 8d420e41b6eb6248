// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scriptable WebSocket server speaking the chat API envelope.
//!
//! Every command received is recorded and passed to a handler closure that
//! decides the reply. Tests can push unsolicited frames to all live
//! connections and drop connections to simulate the chat process going away.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, Notify, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

/// What the server does with one command.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Answer immediately with this `resp` payload under the command's corrId.
    Respond(Value),
    /// Answer after a delay, letting later commands overtake this one.
    Delayed(Duration, Value),
    /// Send nothing.
    Silent,
    /// Drop the connection without a close handshake.
    Drop,
}

type Handler = dyn Fn(&str) -> Reply + Send + Sync;

enum Outgoing {
    Frame(String),
    Close,
}

struct ServerState {
    handler: Box<Handler>,
    commands: Mutex<Vec<String>>,
    connections: AtomicUsize,
    live: Mutex<Vec<mpsc::UnboundedSender<Outgoing>>>,
    notify: Notify,
}

pub struct MockSimplexServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
    accept_task: JoinHandle<()>,
}

impl MockSimplexServer {
    /// Binds to an ephemeral localhost port and starts accepting connections.
    pub async fn start(handler: impl Fn(&str) -> Reply + Send + Sync + 'static) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(ServerState {
            handler: Box::new(handler),
            commands: Mutex::new(Vec::new()),
            connections: AtomicUsize::new(0),
            live: Mutex::new(Vec::new()),
            notify: Notify::new(),
        });
        let accept_state = Arc::clone(&state);
        let accept_task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve_connection(stream, Arc::clone(&accept_state)));
            }
        });
        Ok(Self {
            addr,
            state,
            accept_task,
        })
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Pushes `{"resp": payload}` (no corrId) to every live connection.
    pub async fn push_event(&self, payload: Value) {
        self.push_frame(json!({ "resp": payload }).to_string()).await;
    }

    /// Pushes a response carrying a corrId nobody asked for.
    pub async fn push_with_corr_id(&self, corr_id: &str, payload: Value) {
        self.push_frame(json!({ "corrId": corr_id, "resp": payload }).to_string())
            .await;
    }

    pub async fn push_frame(&self, frame: String) {
        let live = self.state.live.lock().await;
        for conn in live.iter() {
            let _ = conn.send(Outgoing::Frame(frame.clone()));
        }
    }

    /// Closes every live connection without a close handshake.
    pub async fn drop_connections(&self) {
        let mut live = self.state.live.lock().await;
        for conn in live.drain(..) {
            let _ = conn.send(Outgoing::Close);
        }
    }

    /// Total connections accepted so far.
    pub fn connection_count(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    pub async fn received_commands(&self) -> Vec<String> {
        self.state.commands.lock().await.clone()
    }

    pub async fn wait_for_connections(&self, count: usize, timeout: Duration) -> bool {
        self.wait_until(timeout, || async { self.connection_count() >= count })
            .await
    }

    pub async fn wait_for_commands(&self, count: usize, timeout: Duration) -> Vec<String> {
        self.wait_until(timeout, || async {
            self.state.commands.lock().await.len() >= count
        })
        .await;
        self.received_commands().await
    }

    async fn wait_until<F, Fut>(&self, timeout: Duration, done: F) -> bool
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.state.notify.notified();
            if done().await {
                return true;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return done().await;
            }
        }
    }
}

impl Drop for MockSimplexServer {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

async fn serve_connection(stream: TcpStream, state: Arc<ServerState>) {
    let Ok(ws) = tokio_tungstenite::accept_async(stream).await else {
        return;
    };
    let (mut sink, mut source) = ws.split();
    let (tx, mut rx) = mpsc::unbounded_channel();
    state.live.lock().await.push(tx.clone());
    state.connections.fetch_add(1, Ordering::SeqCst);
    state.notify.notify_waiters();

    loop {
        tokio::select! {
            incoming = source.next() => {
                let text = match incoming {
                    Some(Ok(Message::Text(text))) => text.as_str().to_owned(),
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => continue,
                };
                let Ok(frame) = serde_json::from_str::<Value>(&text) else {
                    continue;
                };
                let corr_id = frame.get("corrId").cloned().unwrap_or(Value::Null);
                let cmd = frame.get("cmd").and_then(Value::as_str).unwrap_or_default().to_string();
                debug!(%cmd, "mock server received command");
                let reply = (state.handler)(&cmd);
                state.commands.lock().await.push(cmd);
                state.notify.notify_waiters();
                match reply {
                    Reply::Respond(resp) => {
                        let out = json!({ "corrId": corr_id, "resp": resp }).to_string();
                        if sink.send(Message::text(out)).await.is_err() {
                            break;
                        }
                    }
                    Reply::Delayed(delay, resp) => {
                        let tx = tx.clone();
                        tokio::spawn(async move {
                            tokio::time::sleep(delay).await;
                            let out = json!({ "corrId": corr_id, "resp": resp }).to_string();
                            let _ = tx.send(Outgoing::Frame(out));
                        });
                    }
                    Reply::Silent => {}
                    Reply::Drop => break,
                }
            }
            outgoing = rx.recv() => {
                match outgoing {
                    Some(Outgoing::Frame(frame)) => {
                        if sink.send(Message::text(frame)).await.is_err() {
                            break;
                        }
                    }
                    Some(Outgoing::Close) | None => break,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_tungstenite::connect_async;

    #[tokio::test]
    async fn answers_with_callers_corr_id() {
        let server = MockSimplexServer::start(|cmd| {
            if cmd == "/u" {
                Reply::Respond(json!({"type": "activeUser"}))
            } else {
                Reply::Silent
            }
        })
        .await
        .unwrap();

        let (mut ws, _) = connect_async(server.url()).await.unwrap();
        ws.send(Message::text(r#"{"corrId":"9","cmd":"/u"}"#)).await.unwrap();
        let reply = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let value: Value = serde_json::from_str(reply.to_text().unwrap()).unwrap();
        assert_eq!(value["corrId"], "9");
        assert_eq!(value["resp"]["type"], "activeUser");
        assert_eq!(server.received_commands().await, vec!["/u".to_string()]);
        assert_eq!(server.connection_count(), 1);
    }
}
