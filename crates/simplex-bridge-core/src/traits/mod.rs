// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits at the seams between the bridge and the bridging framework.
//!
//! All traits use `#[async_trait]` for dynamic dispatch compatibility.

pub mod convert;
pub mod framework;
pub mod network;

pub use convert::{ChatInfoProvider, EditConverter, MessageConverter};
pub use framework::{BridgeFramework, MediaUploader};
pub use network::NetworkApi;
