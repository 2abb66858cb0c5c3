//! Mock implementations for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Semaphore;

use parley_core::{
    BackendError, BackendResult, ChannelListParams, ChannelRecord, ChatBackend,
    CreateChannelParams, FileUpload, MessageId, MessageKind, MessageListParams, MessageRecord,
    PageQuery, PushEvent, PushSink, ThumbnailSize, UserRecord,
};

/// Scripted results a [`MockPageQuery`] returns, one entry per fetch.
pub type PageScript<T> = Vec<BackendResult<Vec<T>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn ok_pages<T>(pages: Vec<Vec<T>>) -> PageScript<T> {
    pages.into_iter().map(Ok).collect()
}

/// Wait for one permit if a gate is installed, consuming it.
async fn pass_gate(gate: Option<&Arc<Semaphore>>) {
    if let Some(gate) = gate
        && let Ok(permit) = gate.acquire().await
    {
        permit.forget();
    }
}

// ---------------------------------------------------------------------------
// MockPageQuery
// ---------------------------------------------------------------------------

/// A [`PageQuery`] that replays a script of pages.
///
/// Like the SDK queries it stands in for, `has_more` starts `true` and turns
/// `false` once a successful fetch drains the script. A failed fetch leaves
/// `has_more` untouched.
pub struct MockPageQuery<T> {
    pages: VecDeque<BackendResult<Vec<T>>>,
    has_more: bool,
    is_loading: bool,
    gate: Option<Arc<Semaphore>>,
    fetches: Arc<AtomicUsize>,
}

impl<T> MockPageQuery<T> {
    /// Create a query over `script`.
    #[must_use]
    pub fn new(script: PageScript<T>) -> Self {
        Self {
            pages: script.into(),
            has_more: true,
            is_loading: false,
            gate: None,
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Block every fetch until a permit is added to `gate`.
    #[must_use]
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Count fetches into a shared counter.
    #[must_use]
    pub fn with_fetch_counter(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.fetches = counter;
        self
    }
}

#[async_trait]
impl<T: Send + Sync> PageQuery<T> for MockPageQuery<T> {
    fn has_more(&self) -> bool {
        self.has_more
    }

    fn is_loading(&self) -> bool {
        self.is_loading
    }

    async fn next_page(&mut self) -> BackendResult<Vec<T>> {
        self.is_loading = true;
        self.fetches.fetch_add(1, Ordering::SeqCst);
        pass_gate(self.gate.as_ref()).await;

        let result = self.pages.pop_front().unwrap_or_else(|| Ok(Vec::new()));
        if result.is_ok() {
            self.has_more = !self.pages.is_empty();
        }
        self.is_loading = false;
        result
    }
}

// ---------------------------------------------------------------------------
// MockBackend
// ---------------------------------------------------------------------------

/// A call observed by [`MockBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    /// `connect`.
    Connect {
        /// Backend user ID.
        user_id: String,
        /// Access token presented.
        access_token: String,
    },
    /// `disconnect`.
    Disconnect,
    /// `channel_list_query`.
    ChannelListQuery(ChannelListParams),
    /// `user_list_query`.
    UserListQuery,
    /// `previous_message_query`.
    MessageQuery {
        /// Channel the query walks.
        channel_url: String,
        /// Construction parameters.
        params: MessageListParams,
    },
    /// `get_channel`.
    GetChannel(String),
    /// `create_channel`.
    CreateChannel(CreateChannelParams),
    /// `invite`.
    Invite {
        /// Target channel.
        channel_url: String,
        /// Invited users.
        user_ids: Vec<String>,
    },
    /// `leave`.
    Leave(String),
    /// `send_user_message`.
    SendText {
        /// Target channel.
        channel_url: String,
        /// Message body.
        text: String,
    },
    /// `send_file_message`.
    SendFile {
        /// Target channel.
        channel_url: String,
        /// Uploaded file name.
        file_name: String,
        /// Requested thumbnails.
        thumbnails: Vec<ThumbnailSize>,
    },
    /// `total_unread_count`.
    TotalUnreadCount,
    /// `read_receipt`.
    ReadReceipt {
        /// Channel of the message.
        channel_url: String,
        /// Message queried.
        message_id: MessageId,
    },
    /// `set_push_handler`.
    SetPushHandler(String),
    /// `remove_push_handler`.
    RemovePushHandler(String),
}

/// In-memory [`ChatBackend`] with scripted pages and failure injection.
///
/// Every call is recorded; see [`MockBackend::calls`]. Share it with the
/// client as `Arc<MockBackend>` and keep a clone for assertions.
pub struct MockBackend {
    current_user: Mutex<Option<UserRecord>>,
    channels: Mutex<HashMap<String, ChannelRecord>>,
    channel_pages: Mutex<PageScript<ChannelRecord>>,
    user_pages: Mutex<PageScript<UserRecord>>,
    message_pages: Mutex<HashMap<String, PageScript<MessageRecord>>>,
    failures: Mutex<HashMap<&'static str, BackendError>>,
    connect_gate: Mutex<Option<Arc<Semaphore>>>,
    page_gate: Mutex<Option<Arc<Semaphore>>>,
    fetches: Arc<AtomicUsize>,
    calls: Mutex<Vec<BackendCall>>,
    sinks: Mutex<HashMap<String, PushSink>>,
    next_id: AtomicU64,
    total_unread: u64,
    unread_receipt: u32,
}

impl fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockBackend")
            .field("current_user", &*lock(&self.current_user))
            .field("calls", &lock(&self.calls).len())
            .field("sinks", &lock(&self.sinks).len())
            .finish_non_exhaustive()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a disconnected backend with no channels and empty lists.
    #[must_use]
    pub fn new() -> Self {
        Self {
            current_user: Mutex::new(None),
            channels: Mutex::new(HashMap::new()),
            channel_pages: Mutex::new(Vec::new()),
            user_pages: Mutex::new(Vec::new()),
            message_pages: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            connect_gate: Mutex::new(None),
            page_gate: Mutex::new(None),
            fetches: Arc::new(AtomicUsize::new(0)),
            calls: Mutex::new(Vec::new()),
            sinks: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            total_unread: 0,
            unread_receipt: 0,
        }
    }

    /// Make `channel` available to `get_channel`.
    #[must_use]
    pub fn with_channel(self, channel: ChannelRecord) -> Self {
        lock(&self.channels).insert(channel.channel_url.clone(), channel);
        self
    }

    /// Pages every new channel-list query returns.
    #[must_use]
    pub fn with_channel_pages(self, pages: Vec<Vec<ChannelRecord>>) -> Self {
        self.with_channel_script(ok_pages(pages))
    }

    /// Page results (including failures) every new channel-list query returns.
    #[must_use]
    pub fn with_channel_script(self, script: PageScript<ChannelRecord>) -> Self {
        *lock(&self.channel_pages) = script;
        self
    }

    /// Pages every new user-list query returns.
    #[must_use]
    pub fn with_user_pages(self, pages: Vec<Vec<UserRecord>>) -> Self {
        *lock(&self.user_pages) = ok_pages(pages);
        self
    }

    /// Pages every new message query for `channel_url` returns.
    #[must_use]
    pub fn with_message_pages(self, channel_url: &str, pages: Vec<Vec<MessageRecord>>) -> Self {
        lock(&self.message_pages).insert(channel_url.to_string(), ok_pages(pages));
        self
    }

    /// Value returned by `total_unread_count`.
    #[must_use]
    pub fn with_total_unread(mut self, count: u64) -> Self {
        self.total_unread = count;
        self
    }

    /// Value returned by `read_receipt`.
    #[must_use]
    pub fn with_unread_receipt(mut self, count: u32) -> Self {
        self.unread_receipt = count;
        self
    }

    /// Fail the next call to `operation` (the trait method name) with `error`.
    pub fn fail_next(&self, operation: &'static str, error: BackendError) {
        lock(&self.failures).insert(operation, error);
    }

    /// Block `connect` until a permit is added to the returned semaphore.
    pub fn hold_connect(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *lock(&self.connect_gate) = Some(Arc::clone(&gate));
        gate
    }

    /// Block page fetches on queries created from now on until permits are
    /// added to the returned semaphore.
    pub fn hold_pages(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *lock(&self.page_gate) = Some(Arc::clone(&gate));
        gate
    }

    /// Drop or replace the connected user without a `disconnect` call.
    pub fn set_current_user(&self, user: Option<UserRecord>) {
        *lock(&self.current_user) = user;
    }

    /// All calls observed so far, in order.
    pub fn calls(&self) -> Vec<BackendCall> {
        lock(&self.calls).clone()
    }

    /// Number of `next_page` calls across every query handed out.
    pub fn page_fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Whether a push sink is registered under `key`.
    pub fn has_push_handler(&self, key: &str) -> bool {
        lock(&self.sinks).contains_key(key)
    }

    /// Deliver `event` to every registered sink, as the server would.
    pub fn emit(&self, event: &PushEvent) {
        let sinks: Vec<PushSink> = lock(&self.sinks).values().cloned().collect();
        for sink in sinks {
            sink(event.clone());
        }
    }

    fn record(&self, call: BackendCall) {
        lock(&self.calls).push(call);
    }

    fn take_failure(&self, operation: &'static str) -> BackendResult<()> {
        match lock(&self.failures).remove(operation) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn query<T>(&self, script: PageScript<T>) -> MockPageQuery<T> {
        let query = MockPageQuery::new(script).with_fetch_counter(Arc::clone(&self.fetches));
        match lock(&self.page_gate).clone() {
            Some(gate) => query.with_gate(gate),
            None => query,
        }
    }

    fn sent_message(&self, channel_url: &str, kind: MessageKind) -> MessageRecord {
        MessageRecord {
            message_id: self.next_id(),
            channel_url: channel_url.to_string(),
            kind,
            sender: lock(&self.current_user).clone(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn connect(&self, user_id: &str, access_token: &str) -> BackendResult<UserRecord> {
        self.record(BackendCall::Connect {
            user_id: user_id.to_string(),
            access_token: access_token.to_string(),
        });
        let gate = lock(&self.connect_gate).clone();
        pass_gate(gate.as_ref()).await;
        self.take_failure("connect")?;

        let user = UserRecord::new(user_id, "");
        *lock(&self.current_user) = Some(user.clone());
        Ok(user)
    }

    async fn disconnect(&self) -> BackendResult<()> {
        self.record(BackendCall::Disconnect);
        self.take_failure("disconnect")?;
        *lock(&self.current_user) = None;
        Ok(())
    }

    fn current_user(&self) -> Option<UserRecord> {
        lock(&self.current_user).clone()
    }

    fn channel_list_query(&self, params: ChannelListParams) -> Box<dyn PageQuery<ChannelRecord>> {
        self.record(BackendCall::ChannelListQuery(params));
        let script = lock(&self.channel_pages).clone();
        Box::new(self.query(script))
    }

    fn user_list_query(&self) -> Box<dyn PageQuery<UserRecord>> {
        self.record(BackendCall::UserListQuery);
        let script = lock(&self.user_pages).clone();
        Box::new(self.query(script))
    }

    fn previous_message_query(
        &self,
        channel: &ChannelRecord,
        params: MessageListParams,
    ) -> Box<dyn PageQuery<MessageRecord>> {
        self.record(BackendCall::MessageQuery {
            channel_url: channel.channel_url.clone(),
            params,
        });
        let script = lock(&self.message_pages)
            .get(&channel.channel_url)
            .cloned()
            .unwrap_or_default();
        Box::new(self.query(script))
    }

    async fn get_channel(&self, channel_url: &str) -> BackendResult<ChannelRecord> {
        self.record(BackendCall::GetChannel(channel_url.to_string()));
        self.take_failure("get_channel")?;
        lock(&self.channels)
            .get(channel_url)
            .cloned()
            .ok_or_else(|| BackendError::Rejected {
                code: 400_201,
                message: format!("channel {channel_url} not found"),
            })
    }

    async fn create_channel(&self, params: CreateChannelParams) -> BackendResult<ChannelRecord> {
        self.record(BackendCall::CreateChannel(params.clone()));
        self.take_failure("create_channel")?;

        let members: Vec<UserRecord> = params
            .user_ids
            .iter()
            .map(|id| UserRecord::new(id.as_str(), ""))
            .collect();
        let channel = ChannelRecord {
            channel_url: format!("channel-{}", self.next_id()),
            member_count: u32::try_from(members.len()).unwrap_or(u32::MAX),
            members,
            ..Default::default()
        };
        lock(&self.channels).insert(channel.channel_url.clone(), channel.clone());
        Ok(channel)
    }

    async fn invite(&self, channel_url: &str, user_ids: &[String]) -> BackendResult<()> {
        self.record(BackendCall::Invite {
            channel_url: channel_url.to_string(),
            user_ids: user_ids.to_vec(),
        });
        self.take_failure("invite")
    }

    async fn leave(&self, channel_url: &str) -> BackendResult<()> {
        self.record(BackendCall::Leave(channel_url.to_string()));
        self.take_failure("leave")
    }

    async fn send_user_message(
        &self,
        channel_url: &str,
        text: &str,
    ) -> BackendResult<MessageRecord> {
        self.record(BackendCall::SendText {
            channel_url: channel_url.to_string(),
            text: text.to_string(),
        });
        self.take_failure("send_user_message")?;

        let mut message = self.sent_message(channel_url, MessageKind::User);
        message.message = text.to_string();
        Ok(message)
    }

    async fn send_file_message(
        &self,
        channel_url: &str,
        file: FileUpload,
        thumbnails: &[ThumbnailSize],
    ) -> BackendResult<MessageRecord> {
        self.record(BackendCall::SendFile {
            channel_url: channel_url.to_string(),
            file_name: file.name.clone(),
            thumbnails: thumbnails.to_vec(),
        });
        self.take_failure("send_file_message")?;

        let mut message = self.sent_message(channel_url, MessageKind::File);
        message.name = file.name;
        Ok(message)
    }

    async fn total_unread_count(&self) -> BackendResult<u64> {
        self.record(BackendCall::TotalUnreadCount);
        self.take_failure("total_unread_count")?;
        Ok(self.total_unread)
    }

    async fn read_receipt(&self, channel_url: &str, message_id: MessageId) -> BackendResult<u32> {
        self.record(BackendCall::ReadReceipt {
            channel_url: channel_url.to_string(),
            message_id,
        });
        self.take_failure("read_receipt")?;
        Ok(self.unread_receipt)
    }

    fn set_push_handler(&self, key: &str, sink: PushSink) {
        self.record(BackendCall::SetPushHandler(key.to_string()));
        lock(&self.sinks).insert(key.to_string(), sink);
    }

    fn remove_push_handler(&self, key: &str) {
        self.record(BackendCall::RemovePushHandler(key.to_string()));
        lock(&self.sinks).remove(key);
    }
}
