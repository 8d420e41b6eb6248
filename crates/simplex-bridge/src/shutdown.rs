// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graceful shutdown coordination with signal handling.
//!
//! Installs handlers for SIGTERM and SIGINT (Ctrl+C), triggering a
//! [`CancellationToken`] that the runner waits on. The connection is then
//! closed within a bounded time.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use simplex_bridge_core::BridgeError;

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is received.
pub fn install_signal_handler() -> Result<CancellationToken, BridgeError> {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    #[cfg(unix)]
    let mut sigterm = {
        use tokio::signal::unix::{SignalKind, signal};
        signal(SignalKind::terminate())?
    };

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            tokio::select! {
                _ = ctrl_c => {
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, initiating shutdown");
                }
                _ = token_clone.cancelled() => {
                    debug!("shutdown requested without a signal");
                    return;
                }
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                _ = ctrl_c => info!("received Ctrl+C, initiating shutdown"),
                _ = token_clone.cancelled() => return,
            }
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    Ok(token)
}

/// Runs `teardown`, giving up after `timeout`.
///
/// Returns `false` when the timeout was reached.
pub async fn drain<F>(teardown: F, timeout: Duration) -> bool
where
    F: Future<Output = ()>,
{
    match tokio::time::timeout(timeout, teardown).await {
        Ok(()) => {
            info!("connection closed cleanly");
            true
        }
        Err(_) => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "timeout reached, connection teardown interrupted"
            );
            false
        }
    }
}
