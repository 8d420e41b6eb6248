// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A simplex-chat process owned by the bridge.

use std::process::Stdio;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use simplex_bridge_client::{ChatClient, ClientConfig, EventStream};
use simplex_bridge_config::model::SimplexConfig;
use simplex_bridge_core::BridgeError;

/// Pause between readiness probes of a freshly spawned process.
pub const READY_PROBE_INTERVAL: Duration = Duration::from_secs(1);

/// Picks a free localhost port by binding to port 0.
pub async fn free_port() -> Result<u16, BridgeError> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    Ok(listener.local_addr()?.port())
}

/// Port of a `ws://host:port` URL, if it has one.
pub fn ws_port(ws_url: &str) -> Option<u16> {
    let authority = ws_url.split("://").nth(1)?.split('/').next()?;
    authority.rsplit_once(':')?.1.parse().ok()
}

/// The spawned process. Killed when stopped or dropped.
#[derive(Debug)]
pub struct ManagedProcess {
    child: Child,
    port: u16,
}

impl ManagedProcess {
    /// Spawns `<binary> -p <port> -d <db_path>`.
    pub fn spawn(binary: &str, port: u16, db_path: &str) -> Result<Self, BridgeError> {
        info!(binary, port, db_path, "starting managed simplex-chat process");
        let child = Command::new(binary)
            .arg("-p")
            .arg(port.to_string())
            .arg("-d")
            .arg(db_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BridgeError::Internal(format!("failed to start {binary}: {e}")))?;
        Ok(Self { child, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}", self.port)
    }

    /// Dials the process until it answers or `attempts` run out.
    pub async fn wait_ready(
        &mut self,
        config: &SimplexConfig,
    ) -> Result<(ChatClient, EventStream), BridgeError> {
        let ws_url = self.ws_url();
        let attempts = config.managed_connect_attempts.max(1);
        let mut last_error = None;
        for attempt in 1..=attempts {
            if let Ok(Some(status)) = self.child.try_wait() {
                return Err(BridgeError::Internal(format!(
                    "simplex-chat exited during startup: {status}"
                )));
            }
            match ChatClient::connect(ClientConfig::new(ws_url.clone(), config)).await {
                Ok(connected) => return Ok(connected),
                Err(e) => {
                    debug!(attempt, error = %e, "waiting for simplex-chat to start");
                    last_error = Some(e);
                }
            }
            if attempt < attempts {
                tokio::time::sleep(READY_PROBE_INTERVAL).await;
            }
        }
        let reason = last_error.map(|e| e.to_string()).unwrap_or_default();
        Err(BridgeError::Internal(format!(
            "simplex-chat failed to become ready: {reason}"
        )))
    }

    pub async fn stop(mut self) {
        if let Err(e) = self.child.kill().await {
            warn!(port = self.port, error = %e, "failed to stop managed simplex-chat");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_port_from_ws_url() {
        assert_eq!(ws_port("ws://127.0.0.1:5225"), Some(5225));
        assert_eq!(ws_port("wss://chat.example:443/api"), Some(443));
        assert_eq!(ws_port("ws://localhost"), None);
        assert_eq!(ws_port("localhost:80"), None);
    }

    #[tokio::test]
    async fn free_port_is_nonzero() {
        assert_ne!(free_port().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_binary_fails_to_spawn() {
        let err = ManagedProcess::spawn("/nonexistent/simplex-chat", 5225, "/tmp/db").unwrap_err();
        assert!(err.to_string().contains("failed to start"));
    }
}
