//! Test fixtures for backend records.

use parley_core::{ChannelRecord, MessageId, MessageKind, MessageRecord, UserRecord};

/// Create a test user.
#[must_use]
pub fn test_user(user_id: &str, nickname: &str) -> UserRecord {
    UserRecord::new(user_id, nickname)
}

/// Create an unnamed channel with the given members.
#[must_use]
pub fn test_channel(channel_url: &str, members: &[UserRecord]) -> ChannelRecord {
    ChannelRecord {
        channel_url: channel_url.to_string(),
        members: members.to_vec(),
        member_count: u32::try_from(members.len()).unwrap_or(u32::MAX),
        ..Default::default()
    }
}

/// Create a text message sent by a user.
#[must_use]
pub fn test_message(message_id: MessageId, channel_url: &str, text: &str) -> MessageRecord {
    MessageRecord {
        message_id,
        channel_url: channel_url.to_string(),
        kind: MessageKind::User,
        message: text.to_string(),
        ..Default::default()
    }
}

/// Create a file message.
#[must_use]
pub fn test_file_message(message_id: MessageId, channel_url: &str, name: &str) -> MessageRecord {
    MessageRecord {
        message_id,
        channel_url: channel_url.to_string(),
        kind: MessageKind::File,
        name: name.to_string(),
        ..Default::default()
    }
}
