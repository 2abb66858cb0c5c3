//! Chat backend trait.
//!
//! Defines the narrow interface the client layer consumes from the remote
//! chat SDK. Paginated list queries are exposed as [`PageQuery`] trait
//! objects so the SDK's own query types never cross this boundary.

use async_trait::async_trait;

use crate::error::BackendResult;
use crate::event::PushSink;
use crate::types::{ChannelRecord, MessageId, MessageRecord, UserRecord};

/// A stateful, resumable query over a remote collection.
///
/// The backend owns the paging state: after every [`next_page`] settles
/// (successfully or not) callers read [`has_more`] and [`is_loading`] back
/// from the query rather than tracking them independently.
///
/// [`next_page`]: PageQuery::next_page
/// [`has_more`]: PageQuery::has_more
/// [`is_loading`]: PageQuery::is_loading
#[async_trait]
pub trait PageQuery<T: Send>: Send + Sync {
    /// Whether another page may exist.
    fn has_more(&self) -> bool;

    /// Whether a fetch is currently running on this query.
    fn is_loading(&self) -> bool;

    /// Fetch the next page.
    async fn next_page(&mut self) -> BackendResult<Vec<T>>;
}

/// Construction parameters for the "my channels" list query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelListParams {
    /// Include channels that have no messages yet.
    pub include_empty: bool,
    /// Page size.
    pub limit: usize,
}

/// Construction parameters for a channel's message history query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageListParams {
    /// Page size.
    pub limit: usize,
    /// `false` loads pages older than the current one (oldest first within a page).
    pub reverse: bool,
}

/// Parameters for creating a group channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateChannelParams {
    /// Initial members.
    pub user_ids: Vec<String>,
    /// Reuse an existing channel with exactly these members.
    pub distinct: bool,
}

/// Maximum dimensions of a server-generated thumbnail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailSize {
    /// Maximum width in pixels.
    pub max_width: u32,
    /// Maximum height in pixels.
    pub max_height: u32,
}

/// A file to attach to a message.
#[derive(Clone, PartialEq, Eq)]
pub struct FileUpload {
    /// File name shown to recipients.
    pub name: String,
    /// MIME type.
    pub mime_type: String,
    /// Raw contents.
    pub data: Vec<u8>,
}

impl std::fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileUpload")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.data.len())
            .finish()
    }
}

/// The remote chat SDK as seen by the client layer.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Open the connection as `user_id`, authenticated by `access_token`.
    async fn connect(&self, user_id: &str, access_token: &str) -> BackendResult<UserRecord>;

    /// Close the connection.
    async fn disconnect(&self) -> BackendResult<()>;

    /// The user of the live connection, if any.
    fn current_user(&self) -> Option<UserRecord>;

    /// Create a query over the current user's channels.
    fn channel_list_query(&self, params: ChannelListParams) -> Box<dyn PageQuery<ChannelRecord>>;

    /// Create a query over all users, with backend defaults.
    fn user_list_query(&self) -> Box<dyn PageQuery<UserRecord>>;

    /// Create a query walking `channel`'s history backwards from the newest message.
    fn previous_message_query(
        &self,
        channel: &ChannelRecord,
        params: MessageListParams,
    ) -> Box<dyn PageQuery<MessageRecord>>;

    /// Fetch a single channel.
    async fn get_channel(&self, channel_url: &str) -> BackendResult<ChannelRecord>;

    /// Create a group channel.
    async fn create_channel(&self, params: CreateChannelParams) -> BackendResult<ChannelRecord>;

    /// Invite users into a channel.
    async fn invite(&self, channel_url: &str, user_ids: &[String]) -> BackendResult<()>;

    /// Leave a channel as the current user.
    async fn leave(&self, channel_url: &str) -> BackendResult<()>;

    /// Send a text message.
    async fn send_user_message(&self, channel_url: &str, text: &str)
    -> BackendResult<MessageRecord>;

    /// Send a file message, asking the backend to generate `thumbnails`.
    async fn send_file_message(
        &self,
        channel_url: &str,
        file: FileUpload,
        thumbnails: &[ThumbnailSize],
    ) -> BackendResult<MessageRecord>;

    /// Total unread messages across all of the current user's channels.
    async fn total_unread_count(&self) -> BackendResult<u64>;

    /// Number of members who have not yet read `message_id`.
    async fn read_receipt(&self, channel_url: &str, message_id: MessageId) -> BackendResult<u32>;

    /// Register `sink` under `key`, replacing any sink already under that key.
    fn set_push_handler(&self, key: &str, sink: PushSink);

    /// Remove the sink registered under `key`, if any.
    fn remove_push_handler(&self, key: &str);
}
