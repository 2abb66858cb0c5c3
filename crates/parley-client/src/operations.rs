//! Single-request channel, message, and user operations.
//!
//! Each call issues exactly one backend request and is never retried. All
//! of them refuse to run without a live connection.

use std::sync::Arc;

use parley_core::{
    ChannelRecord, ChatBackend, CreateChannelParams, FileUpload, MessageRecord, ThumbnailSize,
};
use tracing::debug;

use crate::cursor::{CursorRegistry, ScopeKey};
use crate::error::{ClientError, ClientResult};

/// Thumbnail requested for every file message.
pub const FILE_THUMBNAIL: ThumbnailSize = ThumbnailSize {
    max_width: 160,
    max_height: 160,
};

/// Backend operations bound to one client.
pub struct Operations {
    backend: Arc<dyn ChatBackend>,
    cursors: Arc<CursorRegistry>,
}

impl Operations {
    /// Create operations over `backend`, invalidating cursors in `cursors`
    /// when a channel is left.
    pub fn new(backend: Arc<dyn ChatBackend>, cursors: Arc<CursorRegistry>) -> Self {
        Self { backend, cursors }
    }

    fn ensure_connected(&self, operation: &'static str) -> ClientResult<()> {
        if self.backend.current_user().is_some() {
            Ok(())
        } else {
            Err(ClientError::NotConnected(operation))
        }
    }

    /// Fetch a single channel by URL.
    pub async fn channel_info(&self, channel_url: &str) -> ClientResult<ChannelRecord> {
        self.ensure_connected("channel_info")?;
        Ok(self.backend.get_channel(channel_url).await?)
    }

    /// Create a distinct group channel with `user_ids`.
    pub async fn create_channel(&self, user_ids: &[String]) -> ClientResult<ChannelRecord> {
        self.ensure_connected("create_channel")?;
        let channel = self
            .backend
            .create_channel(CreateChannelParams {
                user_ids: user_ids.to_vec(),
                distinct: true,
            })
            .await?;
        debug!(channel_url = %channel.channel_url, members = user_ids.len(), "Channel created");
        Ok(channel)
    }

    /// Invite `user_ids` into `channel`.
    pub async fn invite_members(
        &self,
        channel: &ChannelRecord,
        user_ids: &[String],
    ) -> ClientResult<()> {
        self.ensure_connected("invite_members")?;
        self.backend.invite(&channel.channel_url, user_ids).await?;
        Ok(())
    }

    /// Leave `channel` and drop its message cursor.
    pub async fn leave_channel(&self, channel: &ChannelRecord) -> ClientResult<()> {
        self.ensure_connected("leave_channel")?;
        self.backend.leave(&channel.channel_url).await?;
        self.cursors
            .invalidate(&ScopeKey::messages(channel.channel_url.as_str()));
        debug!(channel_url = %channel.channel_url, "Left channel");
        Ok(())
    }

    /// Send a text message.
    pub async fn send_text(&self, channel: &ChannelRecord, text: &str) -> ClientResult<MessageRecord> {
        self.ensure_connected("send_text")?;
        Ok(self
            .backend
            .send_user_message(&channel.channel_url, text)
            .await?)
    }

    /// Send a file message with a 160×160 thumbnail request.
    pub async fn send_file(
        &self,
        channel: &ChannelRecord,
        file: FileUpload,
    ) -> ClientResult<MessageRecord> {
        self.ensure_connected("send_file")?;
        Ok(self
            .backend
            .send_file_message(&channel.channel_url, file, &[FILE_THUMBNAIL])
            .await?)
    }

    /// Unread messages across all of the current user's channels.
    pub async fn total_unread_count(&self) -> ClientResult<u64> {
        self.ensure_connected("total_unread_count")?;
        Ok(self.backend.total_unread_count().await?)
    }

    /// Members of `channel` who have not read `message`.
    pub async fn read_receipt_count(
        &self,
        channel: &ChannelRecord,
        message: &MessageRecord,
    ) -> ClientResult<u32> {
        self.ensure_connected("read_receipt_count")?;
        Ok(self
            .backend
            .read_receipt(&channel.channel_url, message.message_id)
            .await?)
    }
}
