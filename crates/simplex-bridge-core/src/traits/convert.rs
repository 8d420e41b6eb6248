// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion strategies carried inside remote events.

use async_trait::async_trait;

use crate::error::BridgeError;
use crate::traits::framework::MediaUploader;
use crate::types::{ChatInfo, ConvertedEdit, ConvertedMessage, ExistingPart, PortalKey};

/// Converts a remote message into framework content when the framework is
/// ready to deliver it.
#[async_trait]
pub trait MessageConverter: Send + Sync {
    async fn convert(
        &self,
        portal: &PortalKey,
        uploader: &dyn MediaUploader,
    ) -> Result<ConvertedMessage, BridgeError>;
}

/// Converts a remote edit against the parts the framework already stored.
#[async_trait]
pub trait EditConverter: Send + Sync {
    async fn convert_edit(
        &self,
        portal: &PortalKey,
        uploader: &dyn MediaUploader,
        existing: &[ExistingPart],
    ) -> Result<ConvertedEdit, BridgeError>;
}

/// Looks up chat metadata for a resync.
#[async_trait]
pub trait ChatInfoProvider: Send + Sync {
    async fn chat_info(&self, portal: &PortalKey) -> Result<ChatInfo, BridgeError>;
}
