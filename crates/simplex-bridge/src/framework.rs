// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A standalone bridging framework that logs every normalized event.
//!
//! Media is held in memory under `local://<n>` URLs so that inbound files can
//! be converted and outbound ones downloaded again.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, info, warn};

use simplex_bridge_core::types::{
    BridgeState, LoginMetadata, PortalKey, UploadedMedia, UserId, UserInfo, UserLoginId,
};
use simplex_bridge_core::{BridgeError, BridgeFramework, MediaUploader, RemoteEvent};

const MEDIA_SCHEME: &str = "local://";

#[derive(Default)]
pub struct LoggingFramework {
    media: DashMap<String, Vec<u8>>,
    next_media: AtomicU64,
    metadata: DashMap<UserLoginId, LoginMetadata>,
}

impl LoggingFramework {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metadata(&self, login: &UserLoginId) -> Option<LoginMetadata> {
        self.metadata.get(login).map(|m| m.clone())
    }

    async fn log_event(&self, event: RemoteEvent) {
        let kind = event.kind();
        let portal = event.meta().portal_key.clone();
        let sender = event.meta().sender.as_ref().map(|s| s.sender.to_string());
        match event {
            RemoteEvent::Message {
                id,
                transaction_id,
                converter,
                ..
            } => match converter.convert(&portal, self).await {
                Ok(converted) => {
                    for part in &converted.parts {
                        info!(
                            %kind,
                            portal = %portal.id,
                            sender = ?sender,
                            message_id = %id,
                            transaction_id = ?transaction_id,
                            msg_type = %part.content.msg_type,
                            url = ?part.content.url,
                            body = %part.content.body,
                            "remote message"
                        );
                    }
                }
                Err(e) => warn!(%kind, portal = %portal.id, message_id = %id, error = %e, "failed to convert message"),
            },
            RemoteEvent::Edit { target, converter, .. } => {
                match converter.convert_edit(&portal, self, &[]).await {
                    Ok(edit) => info!(
                        %kind,
                        portal = %portal.id,
                        target = %target,
                        parts = edit.modified_parts.len(),
                        "remote edit"
                    ),
                    Err(e) => warn!(%kind, portal = %portal.id, target = %target, error = %e, "failed to convert edit"),
                }
            }
            RemoteEvent::MessageRemove { target, .. } => {
                info!(%kind, portal = %portal.id, sender = ?sender, target = %target, "remote delete");
            }
            RemoteEvent::Reaction { target, emoji, .. }
            | RemoteEvent::ReactionRemove { target, emoji, .. } => {
                info!(%kind, portal = %portal.id, sender = ?sender, target = %target, %emoji, "remote reaction");
            }
            RemoteEvent::ChatResync { meta, info: provider } => match provider.chat_info(&portal).await {
                Ok(chat) => info!(
                    %kind,
                    portal = %portal.id,
                    create = meta.create_portal,
                    name = ?chat.name,
                    room_type = ?chat.room_type,
                    members = chat.members.as_ref().map(|m| m.members.len()),
                    "chat resync"
                ),
                Err(e) => warn!(%kind, portal = %portal.id, error = %e, "failed to fetch chat info"),
            },
        }
    }
}

#[async_trait]
impl MediaUploader for LoggingFramework {
    async fn upload_media(
        &self,
        portal: &PortalKey,
        data: Vec<u8>,
        file_name: &str,
        mime_type: &str,
    ) -> Result<UploadedMedia, BridgeError> {
        let n = self.next_media.fetch_add(1, Ordering::Relaxed) + 1;
        let url = format!("{MEDIA_SCHEME}{n}");
        debug!(portal = %portal.id, file_name, mime_type, size = data.len(), url = %url, "stored media");
        self.media.insert(url.clone(), data);
        Ok(UploadedMedia { url })
    }
}

#[async_trait]
impl BridgeFramework for LoggingFramework {
    async fn queue_remote_event(&self, event: RemoteEvent) {
        self.log_event(event).await;
    }

    async fn send_bridge_state(&self, state: BridgeState) {
        info!(
            state = %state.state_event,
            error = ?state.error,
            message = ?state.message,
            "bridge state"
        );
    }

    async fn update_ghost_info(&self, user: &UserId, info: UserInfo) -> Result<(), BridgeError> {
        info!(user = %user, name = ?info.name, has_avatar = info.avatar.is_some(), "ghost info");
        Ok(())
    }

    async fn save_login_metadata(
        &self,
        login: &UserLoginId,
        metadata: &LoginMetadata,
    ) -> Result<(), BridgeError> {
        debug!(login_id = %login, ?metadata, "saved login metadata");
        self.metadata.insert(login.clone(), metadata.clone());
        Ok(())
    }

    async fn download_media(&self, url: &str) -> Result<Vec<u8>, BridgeError> {
        self.media
            .get(url)
            .map(|data| data.clone())
            .ok_or_else(|| BridgeError::Media {
                message: format!("unknown media URL {url}"),
                source: None,
            })
    }
}
