//! Server-pushed events.

use std::fmt;
use std::sync::Arc;

use crate::types::{ChannelRecord, MessageId, MessageRecord, UserRecord};

/// Callback the backend invokes for every push event, in delivery order.
pub type PushSink = Arc<dyn Fn(PushEvent) + Send + Sync>;

/// A notification initiated by the server outside any request/response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    /// A new message arrived in a channel.
    MessageReceived {
        /// Channel the message belongs to.
        channel: ChannelRecord,
        /// The new message.
        message: MessageRecord,
    },
    /// An existing message was edited.
    MessageUpdated {
        /// Channel the message belongs to.
        channel: ChannelRecord,
        /// The updated message.
        message: MessageRecord,
    },
    /// A message was deleted.
    MessageDeleted {
        /// Channel the message belonged to.
        channel: ChannelRecord,
        /// ID of the deleted message.
        message_id: MessageId,
    },
    /// Channel properties changed.
    ChannelChanged {
        /// The changed channel.
        channel: ChannelRecord,
    },
    /// Someone started or stopped typing.
    TypingStatusUpdated {
        /// Channel with the typing change.
        channel: ChannelRecord,
    },
    /// Read receipts changed.
    ReadReceiptUpdated {
        /// Channel with the read-receipt change.
        channel: ChannelRecord,
    },
    /// A member left a channel.
    UserLeft {
        /// Channel the user left.
        channel: ChannelRecord,
        /// The departing user.
        user: UserRecord,
    },
    /// A member joined a channel.
    UserJoined {
        /// Channel the user joined.
        channel: ChannelRecord,
        /// The new member.
        user: UserRecord,
    },
}

/// Discriminant of a [`PushEvent`], used for logging and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// [`PushEvent::MessageReceived`].
    MessageReceived,
    /// [`PushEvent::MessageUpdated`].
    MessageUpdated,
    /// [`PushEvent::MessageDeleted`].
    MessageDeleted,
    /// [`PushEvent::ChannelChanged`].
    ChannelChanged,
    /// [`PushEvent::TypingStatusUpdated`].
    TypingStatus,
    /// [`PushEvent::ReadReceiptUpdated`].
    ReadReceipt,
    /// [`PushEvent::UserLeft`].
    UserLeft,
    /// [`PushEvent::UserJoined`].
    UserJoined,
}

impl EventKind {
    /// Stable snake-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MessageReceived => "message_received",
            Self::MessageUpdated => "message_updated",
            Self::MessageDeleted => "message_deleted",
            Self::ChannelChanged => "channel_changed",
            Self::TypingStatus => "typing_status",
            Self::ReadReceipt => "read_receipt",
            Self::UserLeft => "user_left",
            Self::UserJoined => "user_joined",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PushEvent {
    /// The event's kind.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::MessageReceived { .. } => EventKind::MessageReceived,
            Self::MessageUpdated { .. } => EventKind::MessageUpdated,
            Self::MessageDeleted { .. } => EventKind::MessageDeleted,
            Self::ChannelChanged { .. } => EventKind::ChannelChanged,
            Self::TypingStatusUpdated { .. } => EventKind::TypingStatus,
            Self::ReadReceiptUpdated { .. } => EventKind::ReadReceipt,
            Self::UserLeft { .. } => EventKind::UserLeft,
            Self::UserJoined { .. } => EventKind::UserJoined,
        }
    }

    /// The channel every event refers to.
    pub fn channel(&self) -> &ChannelRecord {
        match self {
            Self::MessageReceived { channel, .. }
            | Self::MessageUpdated { channel, .. }
            | Self::MessageDeleted { channel, .. }
            | Self::ChannelChanged { channel }
            | Self::TypingStatusUpdated { channel }
            | Self::ReadReceiptUpdated { channel }
            | Self::UserLeft { channel, .. }
            | Self::UserJoined { channel, .. } => channel,
        }
    }
}
