// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client for the SimpleX chat WebSocket API.
//!
//! [`ChatClient`] wraps one connection: commands are multiplexed by
//! correlation id and every unsolicited frame is delivered, in order, through
//! an [`EventStream`]. [`SimplexEvent::decode`] turns raw events into typed
//! payloads.

pub mod client;
pub mod command;
pub mod event;
pub mod mux;
pub mod oneshot;
pub mod transport;
pub mod types;
pub mod wire;

pub use client::ChatClient;
pub use command::Command;
pub use event::SimplexEvent;
pub use mux::{EventStream, Multiplexer};
pub use transport::ClientConfig;
pub use wire::{CorrIdGen, Event, Response};
