// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Suppression of the asynchronous echo of our own sends.
//!
//! The chat process answers `/_send` synchronously and then redelivers every
//! sent item through the event stream. The event can be read before the send
//! call returns, so sent-direction items wait briefly for in-flight sends to
//! settle before they are checked.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::Notify;
use tracing::debug;

use simplex_bridge_core::MessageId;

/// How long an unconsumed echo record is kept.
pub const ECHO_TTL: Duration = Duration::from_secs(5 * 60);

/// Upper bound on waiting for in-flight sends before checking an echo.
pub const SETTLE_GRACE: Duration = Duration::from_secs(5);

/// Pending echoes keyed by remote message identity.
#[derive(Clone)]
pub struct EchoTracker {
    inner: Arc<Inner>,
}

struct Inner {
    pending: DashMap<MessageId, Instant>,
    in_flight: AtomicUsize,
    settled: Notify,
    ttl: Duration,
}

impl EchoTracker {
    pub fn new() -> Self {
        Self::with_ttl(ECHO_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                pending: DashMap::new(),
                in_flight: AtomicUsize::new(0),
                settled: Notify::new(),
                ttl,
            }),
        }
    }

    /// Marks a send as in flight until the returned guard is dropped.
    pub fn begin_send(&self) -> SendGuard {
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        SendGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Records an echo outside of a send, e.g. for items created by a
    /// multi-item send.
    pub fn record(&self, id: MessageId) {
        self.inner.record(id);
    }

    /// Removes and reports a recorded echo. Expired records never match.
    pub fn consume(&self, id: &MessageId) -> bool {
        match self.inner.pending.remove(id) {
            Some((_, recorded)) => recorded.elapsed() < self.inner.ttl,
            None => false,
        }
    }

    /// Like [`consume`](Self::consume), but first waits, up to `grace`, for
    /// sends in flight to record their ids.
    pub async fn consume_settled(&self, id: &MessageId, grace: Duration) -> bool {
        if self.consume(id) {
            return true;
        }
        let deadline = tokio::time::Instant::now() + grace;
        loop {
            let notified = self.inner.settled.notified();
            if self.inner.in_flight.load(Ordering::SeqCst) == 0 {
                return self.consume(id);
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                debug!(message_id = %id, "in-flight sends did not settle in time");
                return self.consume(id);
            }
            if self.consume(id) {
                return true;
            }
        }
    }

    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.inner.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.pending.is_empty()
    }
}

impl Default for EchoTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    fn record(&self, id: MessageId) {
        let ttl = self.ttl;
        self.pending.retain(|_, recorded| recorded.elapsed() < ttl);
        self.pending.insert(id, Instant::now());
    }
}

/// An in-flight send. Dropping it without [`complete`](Self::complete)
/// counts as a failed send.
pub struct SendGuard {
    inner: Arc<Inner>,
}

impl SendGuard {
    /// Records the id the send produced and ends the send.
    pub fn complete(self, id: MessageId) {
        self.inner.record(id);
    }
}

impl Drop for SendGuard {
    fn drop(&mut self) {
        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.inner.settled.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consume_is_single_use() {
        let echoes = EchoTracker::new();
        echoes.record(MessageId::from("100"));
        assert!(echoes.consume(&MessageId::from("100")));
        assert!(!echoes.consume(&MessageId::from("100")));
        assert!(!echoes.consume(&MessageId::from("101")));
    }

    #[test]
    fn expired_records_do_not_match() {
        let echoes = EchoTracker::with_ttl(Duration::ZERO);
        echoes.record(MessageId::from("1"));
        assert!(!echoes.consume(&MessageId::from("1")));
    }

    #[test]
    fn guard_tracks_in_flight() {
        let echoes = EchoTracker::new();
        let guard = echoes.begin_send();
        assert_eq!(echoes.in_flight(), 1);
        guard.complete(MessageId::from("7"));
        assert_eq!(echoes.in_flight(), 0);
        assert_eq!(echoes.len(), 1);

        drop(echoes.begin_send());
        assert_eq!(echoes.in_flight(), 0);
        assert_eq!(echoes.len(), 1);
    }

    #[tokio::test]
    async fn echo_read_before_send_returns_is_suppressed() {
        let echoes = EchoTracker::new();
        let guard = echoes.begin_send();

        let waiter = {
            let echoes = echoes.clone();
            tokio::spawn(async move {
                echoes
                    .consume_settled(&MessageId::from("100"), Duration::from_secs(2))
                    .await
            })
        };
        tokio::task::yield_now().await;
        guard.complete(MessageId::from("100"));

        assert!(waiter.await.unwrap());
        assert!(echoes.is_empty());
    }

    #[tokio::test]
    async fn unrelated_item_passes_after_sends_settle() {
        let echoes = EchoTracker::new();
        let guard = echoes.begin_send();
        let waiter = {
            let echoes = echoes.clone();
            tokio::spawn(async move {
                echoes
                    .consume_settled(&MessageId::from("101"), Duration::from_secs(2))
                    .await
            })
        };
        tokio::task::yield_now().await;
        guard.complete(MessageId::from("100"));
        assert!(!waiter.await.unwrap());
        assert!(echoes.consume(&MessageId::from("100")));
    }

    #[tokio::test(start_paused = true)]
    async fn grace_bounds_the_wait() {
        let echoes = EchoTracker::new();
        let _stuck = echoes.begin_send();
        let seen = echoes
            .consume_settled(&MessageId::from("5"), Duration::from_millis(50))
            .await;
        assert!(!seen);
    }
}
