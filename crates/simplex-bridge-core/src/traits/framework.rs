// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The bridging framework as seen from the bridge.

use async_trait::async_trait;

use crate::error::BridgeError;
use crate::event::RemoteEvent;
use crate::types::{
    BridgeState, LoginMetadata, PortalKey, UploadedMedia, UserId, UserInfo, UserLoginId,
};

/// Uploads converted media into the framework's content repository.
#[async_trait]
pub trait MediaUploader: Send + Sync {
    async fn upload_media(
        &self,
        portal: &PortalKey,
        data: Vec<u8>,
        file_name: &str,
        mime_type: &str,
    ) -> Result<UploadedMedia, BridgeError>;
}

/// The external bridging framework that owns portal, ghost, and message state.
///
/// The bridge never persists anything itself; every state change is handed
/// to the framework through this trait.
#[async_trait]
pub trait BridgeFramework: MediaUploader + Send + Sync + 'static {
    /// Queues a normalized remote event. Events are queued in arrival order.
    async fn queue_remote_event(&self, event: RemoteEvent);

    /// Reports a connection state change for display.
    async fn send_bridge_state(&self, state: BridgeState);

    /// Pushes fresh profile data for a ghost user.
    async fn update_ghost_info(&self, user: &UserId, info: UserInfo) -> Result<(), BridgeError>;

    /// Persists per-login metadata.
    async fn save_login_metadata(
        &self,
        login: &UserLoginId,
        metadata: &LoginMetadata,
    ) -> Result<(), BridgeError>;

    /// Downloads media referenced by an outgoing message.
    async fn download_media(&self, url: &str) -> Result<Vec<u8>, BridgeError>;
}
