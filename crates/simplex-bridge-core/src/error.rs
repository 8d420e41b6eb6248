// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the SimpleX bridge.

use thiserror::Error;

/// The primary error type used across the bridge crates.
///
/// Variants fall into four groups: transport failures (dial, read, write,
/// connection teardown) which are recoverable by reconnecting, protocol
/// failures (unexpected response type, malformed payload) which fail a single
/// operation, application failures surfaced to the bridging framework, and
/// configuration/internal errors.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// WebSocket dial, read, or write failure.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The connection was torn down while a request was outstanding.
    #[error("connection closed while waiting for response")]
    ConnectionClosed,

    /// The remote process answered with a response type the command does not accept.
    #[error("unexpected response type: {actual} (expected {expected})")]
    UnexpectedResponse { expected: String, actual: String },

    /// A frame or payload could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A bridge identity key could not be decoded.
    #[error("invalid {kind} ID {value:?}")]
    InvalidId { kind: &'static str, value: String },

    /// No live connection to the remote chat process.
    #[error("not logged in")]
    NotLoggedIn,

    /// An outbound send failed; `send_notice` asks the framework to tell the user.
    #[error("send failed: {message}")]
    SendFailed {
        message: String,
        send_notice: bool,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Uploading or downloading media through the framework failed.
    #[error("media error: {message}")]
    Media {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The bridging framework rejected an operation.
    #[error("framework error: {message}")]
    Framework {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Filesystem or process errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Builds a [`BridgeError::Transport`] wrapping the underlying cause.
    pub fn transport(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Builds a [`BridgeError::Protocol`] from a JSON decode failure.
    pub fn decode(what: &str, err: serde_json::Error) -> Self {
        Self::Protocol(format!("failed to parse {what}: {err}"))
    }

    /// Builds a [`BridgeError::UnexpectedResponse`].
    pub fn unexpected(expected: &[&str], actual: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            expected: expected.join("|"),
            actual: actual.into(),
        }
    }

    /// Wraps any error as a send failure that should be reported to the user.
    pub fn send_failed(err: BridgeError) -> Self {
        match err {
            already @ Self::SendFailed { .. } => already,
            other => Self::SendFailed {
                message: other.to_string(),
                send_notice: true,
                source: Some(Box::new(other)),
            },
        }
    }

    /// True for dial, read, write, and teardown failures.
    ///
    /// These are recoverable by reconnecting, and they are the failures after
    /// which a file-bearing send is retried on a fresh connection.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::ConnectionClosed | Self::Timeout { .. }
        )
    }

    /// True for unexpected response types and undecodable payloads.
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::UnexpectedResponse { .. } | Self::Protocol(_))
    }

    /// True when the framework should show the user a failure notice.
    pub fn wants_send_notice(&self) -> bool {
        matches!(self, Self::SendFailed { send_notice: true, .. })
    }
}
