// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the SimpleX bridge.
//!
//! This crate provides the error taxonomy, the identity/content/event types
//! exchanged with the bridging framework, and the collaborator traits at the
//! seams between the bridge and that framework.

pub mod error;
pub mod event;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::BridgeError;
pub use event::{EventMeta, RemoteEvent, RemoteEventKind};
pub use types::{
    BridgeState, BridgeStateEvent, EventSender, LoginMetadata, MessageId, PortalId, PortalKey,
    TransactionId, UserId, UserLoginId,
};

pub use traits::{
    BridgeFramework, ChatInfoProvider, EditConverter, MediaUploader, MessageConverter, NetworkApi,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_recoverable() {
        let closed = BridgeError::ConnectionClosed;
        let dial = BridgeError::transport("dial failed", std::io::Error::other("refused"));
        let timeout = BridgeError::Timeout {
            duration: std::time::Duration::from_secs(10),
        };
        assert!(closed.is_transport());
        assert!(dial.is_transport());
        assert!(timeout.is_transport());
        assert!(!closed.is_protocol());
    }

    #[test]
    fn protocol_errors_are_not_transport() {
        let unexpected = BridgeError::unexpected(&["newChatItems"], "chatCmdError");
        assert!(unexpected.is_protocol());
        assert!(!unexpected.is_transport());
        assert_eq!(
            unexpected.to_string(),
            "unexpected response type: chatCmdError (expected newChatItems)"
        );
    }

    #[test]
    fn send_failed_wraps_once_and_requests_notice() {
        let err = BridgeError::send_failed(BridgeError::ConnectionClosed);
        assert!(err.wants_send_notice());
        let twice = BridgeError::send_failed(err);
        match twice {
            BridgeError::SendFailed { message, .. } => {
                assert_eq!(message, "connection closed while waiting for response");
            }
            other => panic!("expected SendFailed, got {other:?}"),
        }
    }

    #[test]
    fn remote_event_debug_names_kind() {
        let key = PortalKey {
            id: PortalId::from("d:1"),
            receiver: UserLoginId::from("1"),
        };
        let event = RemoteEvent::Reaction {
            meta: EventMeta::new(key),
            target: MessageId::from("5"),
            emoji: "👍".into(),
        };
        let debug = format!("{event:?}");
        assert!(debug.contains("Reaction"));
        assert!(debug.contains("👍"));
        assert_eq!(event.kind().to_string(), "reaction");
    }

    #[test]
    fn all_traits_are_object_safe() {
        fn _framework(_: &dyn BridgeFramework) {}
        fn _uploader(_: &dyn MediaUploader) {}
        fn _message(_: &dyn MessageConverter) {}
        fn _edit(_: &dyn EditConverter) {}
        fn _info(_: &dyn ChatInfoProvider) {}
        fn _network(_: &dyn NetworkApi) {}
    }
}
