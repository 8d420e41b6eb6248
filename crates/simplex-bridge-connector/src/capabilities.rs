// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Room and network features advertised to the framework.

use std::collections::BTreeMap;

use simplex_bridge_core::types::{
    FileFeatures, FormattingFeature, MessageType, NetworkCapabilities, RoomFeatures, RoomType,
    SupportLevel,
};

pub const CAPABILITIES_ID: &str = "simplex-bridge.capabilities.2024";

pub fn room_features(room_type: RoomType) -> RoomFeatures {
    use SupportLevel::{FullySupported, PartialSupport};

    let formatting = BTreeMap::from([
        (FormattingFeature::Bold, FullySupported),
        (FormattingFeature::Italic, FullySupported),
        (FormattingFeature::Strikethrough, FullySupported),
        (FormattingFeature::InlineCode, FullySupported),
        (FormattingFeature::CodeBlock, FullySupported),
        (FormattingFeature::InlineLink, PartialSupport),
    ]);

    let file = BTreeMap::from([
        (
            MessageType::Image.to_string(),
            files(&["image/jpeg", "image/png", "image/gif", "image/webp"], true),
        ),
        (
            MessageType::Video.to_string(),
            files(&["video/mp4", "video/webm"], true),
        ),
        (
            MessageType::Audio.to_string(),
            files(&["audio/mpeg", "audio/aac", "audio/ogg"], false),
        ),
        (MessageType::File.to_string(), files(&["*/*"], true)),
    ]);

    let id = match room_type {
        RoomType::Dm => format!("{CAPABILITIES_ID}+dm"),
        RoomType::Default => CAPABILITIES_ID.to_string(),
    };

    RoomFeatures {
        id,
        formatting,
        file,
        reply: FullySupported,
        edit: FullySupported,
        delete: FullySupported,
        reaction: FullySupported,
        reaction_count: -1,
    }
}

fn files(mime_types: &[&'static str], caption: bool) -> FileFeatures {
    FileFeatures {
        mime_types: mime_types
            .iter()
            .map(|mime| (*mime, SupportLevel::FullySupported))
            .collect(),
        caption: caption.then_some(SupportLevel::FullySupported),
    }
}

pub fn network_capabilities() -> NetworkCapabilities {
    NetworkCapabilities {
        disappearing_messages: false,
        aggressive_update_info: false,
        create_dm_by_identifier: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dm_differs_only_by_id() {
        let dm = room_features(RoomType::Dm);
        let group = room_features(RoomType::Default);
        assert_eq!(dm.id, "simplex-bridge.capabilities.2024+dm");
        assert_eq!(group.id, CAPABILITIES_ID);
        assert_eq!(dm.formatting, group.formatting);
        assert_eq!(dm.file, group.file);
    }

    #[test]
    fn audio_has_no_captions() {
        let features = room_features(RoomType::Default);
        assert_eq!(features.file["audio"].caption, None);
        assert_eq!(
            features.file["image"].caption,
            Some(SupportLevel::FullySupported)
        );
        assert_eq!(
            features.formatting[&FormattingFeature::InlineLink],
            SupportLevel::PartialSupport
        );
        assert_eq!(features.reaction_count, -1);
    }

    #[test]
    fn no_network_extras() {
        let caps = network_capabilities();
        assert!(!caps.disappearing_messages);
        assert!(!caps.create_dm_by_identifier);
    }
}
