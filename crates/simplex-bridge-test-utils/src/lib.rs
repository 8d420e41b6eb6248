// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for SimpleX bridge integration tests.
//!
//! Provides deterministic stand-ins for both external collaborators, so tests
//! run without a real chat process or bridging framework.
//!
//! # Components
//!
//! - [`MockFramework`] - Bridging framework that captures everything it receives
//! - [`MockSimplexServer`] - Scriptable WebSocket server speaking the chat API envelope

pub mod mock_framework;
pub mod mock_server;

pub use mock_framework::{MockFramework, Upload};
pub use mock_server::{MockSimplexServer, Reply};
