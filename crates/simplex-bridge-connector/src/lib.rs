// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SimpleX network connector.
//!
//! [`SimplexConnector`] creates and restores logins. Each login is a
//! [`SimplexNetworkClient`]: a reconnecting lifecycle task feeds the chat
//! process's events through ingestion into the framework, and outbound
//! operations go back through the same connection.

pub mod backfill;
pub mod capabilities;
pub mod chatinfo;
pub mod client;
pub mod connector;
pub mod convert;
pub mod dns;
pub mod echo;
pub mod ids;
pub mod ingest;
pub mod lifecycle;
pub mod login;
pub mod managed;
pub mod media;
pub mod msgconv;
pub mod outbound;
pub mod preview;
pub mod session;

pub use client::SimplexNetworkClient;
pub use connector::SimplexConnector;
pub use echo::EchoTracker;
pub use lifecycle::{ConnectionState, backoff_delay};
pub use login::{LoginProcess, LoginResult};
pub use managed::ManagedProcess;
pub use session::LoginSession;
