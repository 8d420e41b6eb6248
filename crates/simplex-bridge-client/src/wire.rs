// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON envelope exchanged with the chat process.
//!
//! Outbound frames are `{"corrId": "...", "cmd": "..."}`. Inbound frames are
//! `{"corrId": "..."?, "resp": {"type": "...", ...}}`; a frame whose `corrId`
//! is absent or unknown to the caller is an event.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use simplex_bridge_core::BridgeError;

/// Characters of a payload included in debug logs.
const PREVIEW_CHARS: usize = 300;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandFrame<'a> {
    pub corr_id: &'a str,
    pub cmd: &'a str,
}

impl CommandFrame<'_> {
    pub fn to_json(&self) -> Result<String, BridgeError> {
        serde_json::to_string(self)
            .map_err(|e| BridgeError::Protocol(format!("failed to encode command frame: {e}")))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseFrame {
    #[serde(default)]
    pub corr_id: Option<String>,
    #[serde(default)]
    pub resp: Option<Value>,
}

impl ResponseFrame {
    pub fn parse(text: &str) -> Result<Self, BridgeError> {
        serde_json::from_str(text).map_err(|e| BridgeError::decode("websocket frame", e))
    }
}

/// Reads the `type` tag of a response payload.
pub fn payload_type(payload: &Value) -> Option<&str> {
    payload.get("type").and_then(Value::as_str)
}

/// A truncated rendering of a payload for logs.
pub fn preview(payload: &Value) -> String {
    let raw = payload.to_string();
    match raw.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => raw[..idx].to_string(),
        None => raw,
    }
}

/// A response routed to the command that asked for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub resp_type: String,
    pub payload: Value,
}

impl Response {
    pub fn from_payload(payload: Value) -> Result<Self, BridgeError> {
        let resp_type = payload_type(&payload)
            .ok_or_else(|| BridgeError::Protocol("response has no type".to_string()))?
            .to_string();
        Ok(Self { resp_type, payload })
    }

    /// Fails with [`BridgeError::UnexpectedResponse`] unless the type is one of `accepted`.
    pub fn expect(self, accepted: &[&str]) -> Result<Self, BridgeError> {
        if accepted.contains(&self.resp_type.as_str()) {
            Ok(self)
        } else {
            Err(BridgeError::unexpected(accepted, self.resp_type))
        }
    }

    pub fn decode<T: DeserializeOwned>(self) -> Result<T, BridgeError> {
        let what = self.resp_type;
        serde_json::from_value(self.payload).map_err(|e| BridgeError::decode(&what, e))
    }
}

/// An unsolicited frame: a type tag plus the full `resp` payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub event_type: String,
    pub payload: Value,
}

/// Shared correlation id source.
///
/// One counter serves the persistent connection and every one-shot
/// connection so ids never collide within a login.
#[derive(Debug, Clone, Default)]
pub struct CorrIdGen(Arc<AtomicU64>);

impl CorrIdGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> String {
        (self.0.fetch_add(1, Ordering::Relaxed) + 1).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn command_frame_uses_camel_case() {
        let frame = CommandFrame {
            corr_id: "7",
            cmd: "/u",
        };
        let encoded: Value = serde_json::from_str(&frame.to_json().unwrap()).unwrap();
        assert_eq!(encoded, json!({"corrId": "7", "cmd": "/u"}));
    }

    #[test]
    fn response_frame_without_corr_id() {
        let frame = ResponseFrame::parse(r#"{"resp":{"type":"newChatItems"}}"#).unwrap();
        assert!(frame.corr_id.is_none());
        assert_eq!(payload_type(frame.resp.as_ref().unwrap()), Some("newChatItems"));
    }

    #[test]
    fn response_frame_with_null_corr_id() {
        let frame = ResponseFrame::parse(r#"{"corrId":null,"resp":{"type":"x"}}"#).unwrap();
        assert!(frame.corr_id.is_none());
    }

    #[test]
    fn malformed_frame_is_protocol_error() {
        let err = ResponseFrame::parse("not json").unwrap_err();
        assert!(err.is_protocol());
    }

    #[test]
    fn response_expect_rejects_other_types() {
        let resp = Response::from_payload(json!({"type": "chatCmdError"})).unwrap();
        let err = resp.expect(&["activeUser"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unexpected response type: chatCmdError (expected activeUser)"
        );
    }

    #[test]
    fn response_without_type_is_rejected() {
        let err = Response::from_payload(json!({"user": {}})).unwrap_err();
        assert!(err.is_protocol());
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let long = json!({"text": "é".repeat(400)});
        let p = preview(&long);
        assert_eq!(p.chars().count(), PREVIEW_CHARS);
    }

    #[test]
    fn corr_ids_are_monotonic_and_shared() {
        let ids = CorrIdGen::new();
        let clone = ids.clone();
        assert_eq!(ids.next_id(), "1");
        assert_eq!(clone.next_id(), "2");
        assert_eq!(ids.next_id(), "3");
    }
}
