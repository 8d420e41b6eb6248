// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock bridging framework for deterministic testing.
//!
//! `MockFramework` implements `BridgeFramework` and records every call so
//! tests can assert on queued events, reported states, ghost updates, saved
//! metadata, and media uploads.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use simplex_bridge_core::traits::{BridgeFramework, MediaUploader};
use simplex_bridge_core::types::{
    BridgeState, BridgeStateEvent, LoginMetadata, PortalKey, UploadedMedia, UserId, UserInfo,
    UserLoginId,
};
use simplex_bridge_core::{BridgeError, RemoteEvent};

/// A media upload captured by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub portal: PortalKey,
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

#[derive(Default)]
struct Captured {
    events: Vec<RemoteEvent>,
    states: Vec<BridgeState>,
    ghosts: Vec<(UserId, UserInfo)>,
    metadata: Vec<(UserLoginId, LoginMetadata)>,
    uploads: Vec<Upload>,
}

/// A mock bridging framework for testing.
///
/// Media served by `download_media()` is registered with `add_media()`.
/// Uploads succeed with `mxc://mock/<n>` URLs unless `fail_uploads()` was called.
pub struct MockFramework {
    captured: Mutex<Captured>,
    media: Mutex<HashMap<String, Vec<u8>>>,
    upload_error: Mutex<Option<String>>,
    notify: Notify,
}

impl MockFramework {
    pub fn new() -> Self {
        Self {
            captured: Mutex::new(Captured::default()),
            media: Mutex::new(HashMap::new()),
            upload_error: Mutex::new(None),
            notify: Notify::new(),
        }
    }

    /// Registers bytes returned by `download_media(url)`.
    pub async fn add_media(&self, url: &str, data: Vec<u8>) {
        self.media.lock().await.insert(url.to_string(), data);
    }

    /// Makes every subsequent upload fail with `message`.
    pub async fn fail_uploads(&self, message: &str) {
        *self.upload_error.lock().await = Some(message.to_string());
    }

    pub async fn events(&self) -> Vec<RemoteEvent> {
        self.captured.lock().await.events.clone()
    }

    pub async fn states(&self) -> Vec<BridgeState> {
        self.captured.lock().await.states.clone()
    }

    pub async fn state_events(&self) -> Vec<BridgeStateEvent> {
        self.captured
            .lock()
            .await
            .states
            .iter()
            .map(|s| s.state_event)
            .collect()
    }

    pub async fn ghost_updates(&self) -> Vec<(UserId, UserInfo)> {
        self.captured.lock().await.ghosts.clone()
    }

    pub async fn saved_metadata(&self) -> Vec<(UserLoginId, LoginMetadata)> {
        self.captured.lock().await.metadata.clone()
    }

    pub async fn uploads(&self) -> Vec<Upload> {
        self.captured.lock().await.uploads.clone()
    }

    pub async fn clear_events(&self) {
        self.captured.lock().await.events.clear();
    }

    /// Waits until at least `count` events were queued, or the timeout passes.
    ///
    /// Returns whatever was captured at that point.
    pub async fn wait_for_events(&self, count: usize, timeout: Duration) -> Vec<RemoteEvent> {
        self.wait_until(timeout, |c| c.events.len() >= count).await;
        self.events().await
    }

    /// Waits until a state with the given event has been reported `count` times.
    pub async fn wait_for_state(&self, state: BridgeStateEvent, count: usize, timeout: Duration) -> bool {
        self.wait_until(timeout, |c| {
            c.states.iter().filter(|s| s.state_event == state).count() >= count
        })
        .await
    }

    async fn wait_until(&self, timeout: Duration, done: impl Fn(&Captured) -> bool) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.notify.notified();
            if done(&*self.captured.lock().await) {
                return true;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return done(&*self.captured.lock().await);
            }
        }
    }

    async fn record(&self, f: impl FnOnce(&mut Captured)) {
        f(&mut *self.captured.lock().await);
        self.notify.notify_waiters();
    }
}

impl Default for MockFramework {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaUploader for MockFramework {
    async fn upload_media(
        &self,
        portal: &PortalKey,
        data: Vec<u8>,
        file_name: &str,
        mime_type: &str,
    ) -> Result<UploadedMedia, BridgeError> {
        if let Some(message) = self.upload_error.lock().await.clone() {
            return Err(BridgeError::Media {
                message,
                source: None,
            });
        }
        let upload = Upload {
            portal: portal.clone(),
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            data,
        };
        let mut url = String::new();
        self.record(|c| {
            c.uploads.push(upload);
            url = format!("mxc://mock/{}", c.uploads.len());
        })
        .await;
        Ok(UploadedMedia { url })
    }
}

#[async_trait]
impl BridgeFramework for MockFramework {
    async fn queue_remote_event(&self, event: RemoteEvent) {
        self.record(|c| c.events.push(event)).await;
    }

    async fn send_bridge_state(&self, state: BridgeState) {
        self.record(|c| c.states.push(state)).await;
    }

    async fn update_ghost_info(&self, user: &UserId, info: UserInfo) -> Result<(), BridgeError> {
        let user = user.clone();
        self.record(|c| c.ghosts.push((user, info))).await;
        Ok(())
    }

    async fn save_login_metadata(
        &self,
        login: &UserLoginId,
        metadata: &LoginMetadata,
    ) -> Result<(), BridgeError> {
        let entry = (login.clone(), metadata.clone());
        self.record(|c| c.metadata.push(entry)).await;
        Ok(())
    }

    async fn download_media(&self, url: &str) -> Result<Vec<u8>, BridgeError> {
        self.media
            .lock()
            .await
            .get(url)
            .cloned()
            .ok_or_else(|| BridgeError::Media {
                message: format!("no media registered for {url}"),
                source: None,
            })
    }
}
