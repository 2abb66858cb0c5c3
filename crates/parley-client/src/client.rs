//! The `ChatClient` facade.
//!
//! Wires the session, cursor registry, dispatcher, and operations around one
//! backend. Failures stop here: every method logs the error and returns
//! `None` or `false`, so callers treat a missing result as "did not happen".

use std::sync::Arc;

use parley_config::Config;
use parley_core::{ChannelRecord, ChatBackend, FileUpload, MessageRecord, UserRecord};
use tracing::warn;

use crate::cursor::{CursorRegistry, CursorState, PageOutcome, ScopeKey};
use crate::dispatch::{EventDispatcher, EventHandlers, SubscriptionId};
use crate::error::ClientResult;
use crate::format;
use crate::identity::{CredentialSource, HttpIdentityExchange};
use crate::operations::Operations;
use crate::session::{ConnectionState, Session, SessionManager};

/// Member-count display settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplaySettings {
    /// Largest count shown as a number.
    pub member_count_cap: u32,
    /// Shown instead of counts above the cap.
    pub max_count_label: String,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            member_count_cap: 9,
            max_count_label: "9+".to_string(),
        }
    }
}

/// One user's connection to the chat backend.
pub struct ChatClient {
    session: SessionManager,
    cursors: Arc<CursorRegistry>,
    dispatcher: EventDispatcher,
    operations: Operations,
    display: DisplaySettings,
}

fn logged<T>(operation: &'static str, result: ClientResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(operation, error = %e, "Chat operation failed");
            None
        },
    }
}

impl ChatClient {
    /// Create a client resolving credentials through `credentials`.
    pub fn new(backend: Arc<dyn ChatBackend>, credentials: Arc<dyn CredentialSource>) -> Self {
        let cursors = Arc::new(CursorRegistry::new(Arc::clone(&backend)));
        Self {
            session: SessionManager::new(Arc::clone(&backend), credentials),
            dispatcher: EventDispatcher::new(Arc::clone(&backend)),
            operations: Operations::new(backend, Arc::clone(&cursors)),
            cursors,
            display: DisplaySettings::default(),
        }
    }

    /// Create a client that exchanges identities over HTTP as configured.
    pub fn from_config(backend: Arc<dyn ChatBackend>, config: &Config) -> ClientResult<Self> {
        let exchange = HttpIdentityExchange::from_config(&config.identity)?;
        Ok(Self::new(backend, Arc::new(exchange)).with_display(DisplaySettings {
            member_count_cap: config.chat.member_count_cap,
            max_count_label: config.chat.max_count_label.clone(),
        }))
    }

    /// Override the member-count display settings.
    #[must_use]
    pub fn with_display(mut self, display: DisplaySettings) -> Self {
        self.display = display;
        self
    }

    // -- Session ------------------------------------------------------------

    /// Resolve credentials and connect. `None` if any step failed.
    pub async fn connect(&self, local_user_id: &str, display_name: &str) -> Option<UserRecord> {
        let user = logged(
            "connect",
            self.session.connect(local_user_id, display_name).await,
        )?;
        // Cursors from an earlier connection would page a dead session.
        self.cursors.invalidate_all();
        Some(user)
    }

    /// Disconnect and tear down cursors and the event subscription.
    ///
    /// A no-op returning `false` when not connected.
    pub async fn disconnect(&self) -> bool {
        match self.session.disconnect().await {
            Ok(false) => false,
            Ok(true) => {
                self.reset();
                true
            },
            Err(e) => {
                self.reset();
                warn!(operation = "disconnect", error = %e, "Chat operation failed");
                false
            },
        }
    }

    /// Drop every cursor and the event subscription. Connection state is
    /// left alone. Safe to call repeatedly.
    pub fn reset(&self) {
        self.cursors.invalidate_all();
        self.dispatcher.unsubscribe();
    }

    /// Whether the backend has a live current user.
    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// Lifecycle state of the session.
    pub fn connection_state(&self) -> ConnectionState {
        self.session.state()
    }

    /// Snapshot of the session.
    pub fn session(&self) -> Option<Session> {
        self.session.session()
    }

    /// The connected user.
    pub fn current_user(&self) -> Option<UserRecord> {
        self.session.current_user()
    }

    /// Whether `user` is the connected user.
    pub fn is_current_user(&self, user: &UserRecord) -> bool {
        self.session.is_current_user(user)
    }

    // -- Events -------------------------------------------------------------

    /// Register `handlers`, replacing any earlier subscription.
    pub fn subscribe(&self, handlers: EventHandlers) -> SubscriptionId {
        self.dispatcher.subscribe(handlers)
    }

    /// Remove the subscription. `false` if there was none.
    pub fn unsubscribe(&self) -> bool {
        self.dispatcher.unsubscribe()
    }

    /// Whether an event subscription is registered.
    pub fn is_subscribed(&self) -> bool {
        self.dispatcher.is_subscribed()
    }

    // -- Paging -------------------------------------------------------------

    /// Next page of the user's channels.
    ///
    /// `None` when the list is exhausted, a fetch is already running, or the
    /// fetch failed.
    pub async fn channels_page(&self) -> Option<Vec<ChannelRecord>> {
        logged("channels_page", self.cursors.fetch_channels().await)
            .and_then(PageOutcome::into_page)
    }

    /// Next page of the global user list.
    pub async fn users_page(&self) -> Option<Vec<UserRecord>> {
        logged("users_page", self.cursors.fetch_users().await).and_then(PageOutcome::into_page)
    }

    /// Next older page of `channel`'s messages.
    pub async fn messages_page(&self, channel: &ChannelRecord) -> Option<Vec<MessageRecord>> {
        logged("messages_page", self.cursors.fetch_messages(channel).await)
            .and_then(PageOutcome::into_page)
    }

    /// Restart paging for `scope` from the newest page.
    pub fn invalidate(&self, scope: &ScopeKey) -> bool {
        self.cursors.invalidate(scope)
    }

    /// Restart paging for every scope.
    pub fn invalidate_all(&self) {
        self.cursors.invalidate_all();
    }

    /// Flags of the cursor for `scope`.
    pub fn cursor_state(&self, scope: &ScopeKey) -> Option<CursorState> {
        self.cursors.state(scope)
    }

    // -- Operations ---------------------------------------------------------

    /// Fetch one channel.
    pub async fn channel_info(&self, channel_url: &str) -> Option<ChannelRecord> {
        logged("channel_info", self.operations.channel_info(channel_url).await)
    }

    /// Create a distinct group channel.
    pub async fn create_channel(&self, user_ids: &[String]) -> Option<ChannelRecord> {
        logged("create_channel", self.operations.create_channel(user_ids).await)
    }

    /// Invite users into `channel`.
    pub async fn invite_members(&self, channel: &ChannelRecord, user_ids: &[String]) -> bool {
        logged(
            "invite_members",
            self.operations.invite_members(channel, user_ids).await,
        )
        .is_some()
    }

    /// Leave `channel`.
    pub async fn leave_channel(&self, channel: &ChannelRecord) -> bool {
        logged("leave_channel", self.operations.leave_channel(channel).await).is_some()
    }

    /// Send a text message.
    pub async fn send_text(&self, channel: &ChannelRecord, text: &str) -> Option<MessageRecord> {
        logged("send_text", self.operations.send_text(channel, text).await)
    }

    /// Send a file message.
    pub async fn send_file(
        &self,
        channel: &ChannelRecord,
        file: FileUpload,
    ) -> Option<MessageRecord> {
        logged("send_file", self.operations.send_file(channel, file).await)
    }

    /// Unread messages across all channels.
    pub async fn total_unread_count(&self) -> Option<u64> {
        logged(
            "total_unread_count",
            self.operations.total_unread_count().await,
        )
    }

    /// Members of `channel` who have not read `message`.
    pub async fn read_receipt_count(
        &self,
        channel: &ChannelRecord,
        message: &MessageRecord,
    ) -> Option<u32> {
        logged(
            "read_receipt_count",
            self.operations.read_receipt_count(channel, message).await,
        )
    }

    // -- Display ------------------------------------------------------------

    /// Escaped channel name, falling back to the other members' nicknames.
    pub fn channel_name(&self, channel: &ChannelRecord) -> String {
        let current = self.current_user().map(|u| u.user_id).unwrap_or_default();
        format::channel_display_name(channel, &current)
    }

    /// Member count, capped per [`DisplaySettings`].
    pub fn member_count(&self, channel: &ChannelRecord) -> String {
        format::member_count_label(
            channel.member_count,
            self.display.member_count_cap,
            &self.display.max_count_label,
        )
    }

    /// Unread messages in `channel`.
    pub fn unread_count(&self, channel: &ChannelRecord) -> u32 {
        channel.unread_message_count
    }

    /// Preview text of `channel`'s last message.
    pub fn last_message(&self, channel: &ChannelRecord) -> String {
        format::last_message_label(channel)
    }

    /// When `channel`'s last message was sent, relative to now.
    pub fn message_time(&self, channel: &ChannelRecord) -> String {
        format::message_time_label(channel.last_message.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{Credentials, StaticCredentials};
    use parley_core::{BackendError, PushEvent};
    use parley_test::{
        BackendCall, MockBackend, test_channel, test_file_message, test_message, test_user,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn client(backend: &Arc<MockBackend>) -> ChatClient {
        let creds = StaticCredentials::new(Credentials::new("me", "tok").unwrap());
        ChatClient::new(backend.clone(), Arc::new(creds))
    }

    #[tokio::test]
    async fn disconnect_when_not_connected_is_noop() {
        let backend = Arc::new(MockBackend::new());
        let client = client(&backend);
        client.subscribe(EventHandlers::new());

        assert!(!client.disconnect().await);
        assert!(client.is_subscribed());
        assert!(!backend.calls().contains(&BackendCall::Disconnect));
    }

    #[tokio::test]
    async fn disconnect_tears_down_cursors_and_subscription() {
        let backend = Arc::new(MockBackend::new().with_channel_pages(vec![vec![], vec![]]));
        let client = client(&backend);
        client.connect("guest", "Guest").await.unwrap();
        client.channels_page().await.unwrap();
        client.subscribe(EventHandlers::new());

        assert!(client.disconnect().await);
        assert!(!client.is_connected());
        assert!(!client.is_subscribed());
        assert!(client.cursor_state(&ScopeKey::Channels).is_none());
        assert!(!backend.has_push_handler(crate::GLOBAL_HANDLER));
    }

    #[tokio::test]
    async fn failed_backend_disconnect_still_tears_down() {
        let backend = Arc::new(MockBackend::new());
        let client = client(&backend);
        client.connect("guest", "Guest").await.unwrap();
        client.subscribe(EventHandlers::new());
        backend.fail_next("disconnect", BackendError::Transport("gone".into()));

        assert!(!client.disconnect().await);
        assert!(!client.is_subscribed());
        assert!(client.session().is_none());
    }

    #[tokio::test]
    async fn reset_is_idempotent_and_keeps_connection() {
        let backend = Arc::new(MockBackend::new().with_user_pages(vec![vec![], vec![]]));
        let client = client(&backend);
        client.connect("guest", "Guest").await.unwrap();
        client.users_page().await.unwrap();
        client.subscribe(EventHandlers::new());

        client.reset();
        client.reset();
        assert!(client.is_connected());
        assert!(!client.is_subscribed());
        assert!(client.cursor_state(&ScopeKey::Users).is_none());
    }

    #[tokio::test]
    async fn failed_connect_returns_none() {
        let backend = Arc::new(MockBackend::new());
        backend.fail_next("connect", BackendError::Transport("refused".into()));
        let client = client(&backend);

        assert!(client.connect("guest", "Guest").await.is_none());
        assert_eq!(client.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn failed_reconnect_leaves_state_matching_connection() {
        let backend = Arc::new(MockBackend::new().with_channel_pages(vec![vec![], vec![]]));
        let client = client(&backend);
        client.connect("guest", "Guest").await.unwrap();
        client.channels_page().await.unwrap();

        backend.fail_next("connect", BackendError::Transport("refused".into()));
        assert!(client.connect("guest", "Guest").await.is_none());

        assert!(client.is_connected());
        assert_eq!(client.connection_state(), ConnectionState::Connected);
        assert_eq!(client.session().unwrap().display_name, "Guest");
        assert!(client.channels_page().await.is_some());
    }

    #[tokio::test]
    async fn paging_while_disconnected_returns_none() {
        let backend = Arc::new(MockBackend::new().with_channel_pages(vec![vec![]]));
        let client = client(&backend);

        assert!(client.channels_page().await.is_none());
        assert_eq!(backend.page_fetches(), 0);
    }

    #[tokio::test]
    async fn exhausted_scope_returns_none() {
        let backend = Arc::new(
            MockBackend::new().with_channel_pages(vec![vec![test_channel("ch-1", &[])]]),
        );
        let client = client(&backend);
        client.connect("guest", "Guest").await.unwrap();

        assert_eq!(client.channels_page().await.unwrap().len(), 1);
        assert!(client.channels_page().await.is_none());

        assert!(client.invalidate(&ScopeKey::Channels));
        assert_eq!(client.channels_page().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_operation_returns_none() {
        let backend = Arc::new(MockBackend::new());
        let client = client(&backend);
        client.connect("guest", "Guest").await.unwrap();
        backend.fail_next("invite", BackendError::Transport("reset".into()));

        let channel = test_channel("ch-1", &[]);
        assert!(!client.invite_members(&channel, &["u2".to_string()]).await);
        assert!(client.invite_members(&channel, &["u2".to_string()]).await);
    }

    #[tokio::test]
    async fn events_reach_subscriber_until_reset() {
        let backend = Arc::new(MockBackend::new());
        let client = client(&backend);
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        client.subscribe(EventHandlers::new().on_message_received(move |_, _| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        let event = PushEvent::MessageReceived {
            channel: test_channel("ch-1", &[]),
            message: test_message(1, "ch-1", "hi"),
        };
        backend.emit(&event);
        client.reset();
        backend.emit(&event);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn display_helpers_use_current_user_and_settings() {
        let backend = Arc::new(MockBackend::new());
        let client = client(&backend).with_display(DisplaySettings {
            member_count_cap: 2,
            max_count_label: "2+".to_string(),
        });
        client.connect("guest", "Guest").await.unwrap();

        let channel = test_channel(
            "ch-1",
            &[
                test_user("me", "Me"),
                test_user("u2", "Bob"),
                test_user("u3", "Carol"),
            ],
        );
        assert_eq!(client.channel_name(&channel), "Bob,Carol");
        assert_eq!(client.member_count(&channel), "2+");
    }

    #[test]
    fn last_message_helpers() {
        let backend = Arc::new(MockBackend::new());
        let client = client(&backend);
        let mut channel = test_channel("ch-1", &[]);
        channel.unread_message_count = 7;
        assert_eq!(client.unread_count(&channel), 7);
        assert_eq!(client.last_message(&channel), "");
        assert_eq!(client.message_time(&channel), "");

        channel.last_message = Some(test_file_message(1, "ch-1", "cat.png"));
        assert_eq!(client.last_message(&channel), "cat.png");
    }
}
