// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Normalized remote-chat operations queued to the bridging framework.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use strum::Display;

use crate::traits::{ChatInfoProvider, EditConverter, MessageConverter};
use crate::types::{EventSender, MessageId, PortalKey, TransactionId};

/// Fields shared by every remote event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMeta {
    pub portal_key: PortalKey,
    pub sender: Option<EventSender>,
    pub timestamp: DateTime<Utc>,
    /// Create the portal if the framework does not know it yet.
    pub create_portal: bool,
    /// Remote item id the event refers to, for log context.
    pub item_id: Option<i64>,
}

impl EventMeta {
    pub fn new(portal_key: PortalKey) -> Self {
        Self {
            portal_key,
            sender: None,
            timestamp: Utc::now(),
            create_portal: false,
            item_id: None,
        }
    }

    pub fn sender(mut self, sender: EventSender) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn create_portal(mut self, create: bool) -> Self {
        self.create_portal = create;
        self
    }

    pub fn item_id(mut self, item_id: i64) -> Self {
        self.item_id = Some(item_id);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum RemoteEventKind {
    Message,
    Edit,
    MessageRemove,
    Reaction,
    ReactionRemove,
    ChatResync,
}

/// An operation the framework applies to its portal state.
///
/// Conversion and chat-info lookups are carried as strategy objects; the
/// framework invokes them on its own schedule.
#[derive(Clone)]
pub enum RemoteEvent {
    Message {
        meta: EventMeta,
        id: MessageId,
        /// Set for messages sent by this login so the framework can match them
        /// against its own pending sends.
        transaction_id: Option<TransactionId>,
        converter: Arc<dyn MessageConverter>,
    },
    Edit {
        meta: EventMeta,
        target: MessageId,
        converter: Arc<dyn EditConverter>,
    },
    MessageRemove {
        meta: EventMeta,
        target: MessageId,
    },
    Reaction {
        meta: EventMeta,
        target: MessageId,
        emoji: String,
    },
    ReactionRemove {
        meta: EventMeta,
        target: MessageId,
        emoji: String,
    },
    ChatResync {
        meta: EventMeta,
        info: Arc<dyn ChatInfoProvider>,
    },
}

impl RemoteEvent {
    pub fn kind(&self) -> RemoteEventKind {
        match self {
            Self::Message { .. } => RemoteEventKind::Message,
            Self::Edit { .. } => RemoteEventKind::Edit,
            Self::MessageRemove { .. } => RemoteEventKind::MessageRemove,
            Self::Reaction { .. } => RemoteEventKind::Reaction,
            Self::ReactionRemove { .. } => RemoteEventKind::ReactionRemove,
            Self::ChatResync { .. } => RemoteEventKind::ChatResync,
        }
    }

    pub fn meta(&self) -> &EventMeta {
        match self {
            Self::Message { meta, .. }
            | Self::Edit { meta, .. }
            | Self::MessageRemove { meta, .. }
            | Self::Reaction { meta, .. }
            | Self::ReactionRemove { meta, .. }
            | Self::ChatResync { meta, .. } => meta,
        }
    }

    /// The message the event targets or introduces, if any.
    pub fn message_id(&self) -> Option<&MessageId> {
        match self {
            Self::Message { id, .. } => Some(id),
            Self::Edit { target, .. }
            | Self::MessageRemove { target, .. }
            | Self::Reaction { target, .. }
            | Self::ReactionRemove { target, .. } => Some(target),
            Self::ChatResync { .. } => None,
        }
    }
}

impl fmt::Debug for RemoteEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("RemoteEvent");
        s.field("kind", &self.kind()).field("meta", self.meta());
        if let Some(id) = self.message_id() {
            s.field("message_id", id);
        }
        match self {
            Self::Reaction { emoji, .. } | Self::ReactionRemove { emoji, .. } => {
                s.field("emoji", emoji);
            }
            Self::Message { transaction_id, .. } => {
                s.field("transaction_id", transaction_id);
            }
            _ => {}
        }
        s.finish()
    }
}
