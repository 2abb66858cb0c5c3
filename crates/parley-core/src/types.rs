//! Records mirrored from the chat backend.
//!
//! Only the fields this layer reads are modelled. Unknown fields are dropped
//! by serde's default deserialization. The client never mutates a record in
//! place; changes go through [`ChatBackend`](crate::ChatBackend) calls and
//! come back as fresh records or push events.

use serde::{Deserialize, Serialize};

/// Backend-assigned message identifier.
pub type MessageId = u64;

/// A chat user as seen by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Backend user ID.
    pub user_id: String,
    /// Display nickname. May be empty.
    #[serde(default)]
    pub nickname: String,
    /// Avatar URL, if the user has one.
    #[serde(default)]
    pub profile_url: Option<String>,
}

impl UserRecord {
    /// Create a user record with the given ID and nickname.
    pub fn new(user_id: impl Into<String>, nickname: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            nickname: nickname.into(),
            profile_url: None,
        }
    }
}

/// The kind of a message, as reported by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Plain text sent by a user.
    #[default]
    User,
    /// Text sent by an administrator or the platform.
    Admin,
    /// File attachment.
    File,
}

impl MessageKind {
    /// Whether messages of this kind carry displayable text.
    pub fn has_text(self) -> bool {
        matches!(self, Self::User | Self::Admin)
    }
}

/// A message in a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    /// Backend message ID.
    pub message_id: MessageId,
    /// URL of the channel this message belongs to.
    pub channel_url: String,
    /// Message kind.
    #[serde(default)]
    pub kind: MessageKind,
    /// Text body (user and admin messages).
    #[serde(default)]
    pub message: String,
    /// Name (file messages carry the file name here).
    #[serde(default)]
    pub name: String,
    /// Creation instant in milliseconds since the Unix epoch.
    pub created_at: i64,
    /// Sender, absent for admin messages.
    #[serde(default)]
    pub sender: Option<UserRecord>,
}

/// A group channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelRecord {
    /// Backend channel URL (the channel's identifier).
    pub channel_url: String,
    /// Explicit channel name. Empty when the channel is unnamed.
    #[serde(default)]
    pub name: String,
    /// Channel members in backend order.
    #[serde(default)]
    pub members: Vec<UserRecord>,
    /// Member count as reported by the backend.
    #[serde(default)]
    pub member_count: u32,
    /// Most recent message, if any.
    #[serde(default)]
    pub last_message: Option<MessageRecord>,
    /// Unread messages for the current user.
    #[serde(default)]
    pub unread_message_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_kind_text_flag() {
        assert!(MessageKind::User.has_text());
        assert!(MessageKind::Admin.has_text());
        assert!(!MessageKind::File.has_text());
    }

    #[test]
    fn channel_deserializes_sdk_field_names() {
        let json = r#"{
            "channelUrl": "sendbird_group_channel_1",
            "memberCount": 2,
            "members": [{"userId": "me"}, {"userId": "u2", "nickname": "Bob"}],
            "lastMessage": {"messageId": 7, "channelUrl": "sendbird_group_channel_1",
                            "kind": "file", "name": "cat.png", "createdAt": 0},
            "unknownField": true
        }"#;
        let channel: ChannelRecord = serde_json::from_str(json).unwrap();

        assert_eq!(channel.channel_url, "sendbird_group_channel_1");
        assert!(channel.name.is_empty());
        assert_eq!(channel.members[0].nickname, "");
        assert_eq!(channel.members[1].nickname, "Bob");
        let last = channel.last_message.unwrap();
        assert_eq!(last.kind, MessageKind::File);
        assert_eq!(last.name, "cat.png");
    }
}
