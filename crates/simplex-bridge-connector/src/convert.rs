// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Strategy objects carried inside queued remote events.

use std::path::PathBuf;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tracing::warn;

use simplex_bridge_client::types::ChatItem;
use simplex_bridge_config::model::BridgeConfig;
use simplex_bridge_core::types::{
    ChatInfo, ConvertedEdit, ConvertedEditPart, ConvertedMessage, ExistingPart, MessageContent,
};
use simplex_bridge_core::{
    BridgeError, ChatInfoProvider, EditConverter, MediaUploader, MessageConverter, PortalKey,
};

use crate::chatinfo;
use crate::media::upload_file_part;
use crate::msgconv::convert_chat_item;
use crate::session::LoginSession;

/// Converts a new chat item, uploading its attachment if one is on disk.
pub struct ChatItemConverter {
    item: ChatItem,
    config: Arc<BridgeConfig>,
}

impl ChatItemConverter {
    pub fn new(item: ChatItem, config: Arc<BridgeConfig>) -> Self {
        Self { item, config }
    }

    fn file_path(&self, raw: &str) -> PathBuf {
        self.config.bridge.resolve_file_path(raw)
    }
}

#[async_trait]
impl MessageConverter for ChatItemConverter {
    async fn convert(
        &self,
        portal: &PortalKey,
        uploader: &dyn MediaUploader,
    ) -> Result<ConvertedMessage, BridgeError> {
        let mut converted = convert_chat_item(&self.item);
        for part in &mut converted.parts {
            let Some(raw) = part.pending_file.take() else {
                continue;
            };
            let path = self.file_path(&raw);
            if let Err(e) = upload_file_part(portal, uploader, &mut part.content, &path).await {
                warn!(path = %path.display(), error = %e, "failed to upload file");
                part.content = MessageContent::notice(format!("[File transfer failed: {e}]"));
            }
        }
        Ok(converted)
    }
}

/// Converts an edited chat item against the parts already bridged.
pub struct ChatItemEditConverter {
    item: ChatItem,
    config: Arc<BridgeConfig>,
}

impl ChatItemEditConverter {
    pub fn new(item: ChatItem, config: Arc<BridgeConfig>) -> Self {
        Self { item, config }
    }
}

#[async_trait]
impl EditConverter for ChatItemEditConverter {
    async fn convert_edit(
        &self,
        portal: &PortalKey,
        uploader: &dyn MediaUploader,
        existing: &[ExistingPart],
    ) -> Result<ConvertedEdit, BridgeError> {
        let converted = convert_chat_item(&self.item);
        let mut edit = ConvertedEdit::default();
        for mut part in converted.parts {
            let target = existing
                .iter()
                .find(|e| e.part_id == part.id)
                .or_else(|| existing.first());
            let Some(target) = target else {
                continue;
            };
            if let Some(raw) = part.pending_file.take() {
                let path = self.config.bridge.resolve_file_path(&raw);
                if let Err(e) = upload_file_part(portal, uploader, &mut part.content, &path).await {
                    warn!(path = %path.display(), error = %e, "failed to upload edited file");
                }
            }
            edit.modified_parts.push(ConvertedEditPart {
                part: target.clone(),
                content: part.content,
            });
        }
        Ok(edit)
    }
}

/// Looks up chat info through the login's current connection.
///
/// Holds the session weakly, so a queued resync never keeps a logged-out
/// session alive.
pub struct LiveChatInfo {
    session: Weak<LoginSession>,
    with_members: bool,
}

impl LiveChatInfo {
    pub fn new(session: &Arc<LoginSession>, with_members: bool) -> Self {
        Self {
            session: Arc::downgrade(session),
            with_members,
        }
    }
}

#[async_trait]
impl ChatInfoProvider for LiveChatInfo {
    async fn chat_info(&self, portal: &PortalKey) -> Result<ChatInfo, BridgeError> {
        let session = self.session.upgrade().ok_or(BridgeError::NotLoggedIn)?;
        let mut info = chatinfo::chat_info(&session, portal).await?;
        if !self.with_members {
            info.members = None;
        }
        Ok(info)
    }
}
