//! Lazy, single-flight pagination cursors keyed by scope.
//!
//! Each scope owns at most one backend [`PageQuery`]. The registry takes the
//! query out of its slot for the duration of a fetch so no lock is held
//! across the backend call; the slot's `is_loading` flag turns concurrent
//! requests for the same scope into [`PageOutcome::InFlight`] no-ops.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use parley_core::{
    ChannelListParams, ChannelRecord, ChatBackend, MessageListParams, MessageRecord, PageQuery,
    UserRecord,
};
use tracing::{debug, trace};

use crate::error::{ClientError, ClientResult};

/// Page size for channel-list and message-history cursors.
pub const PAGE_SIZE: usize = 20;

/// A named pagination context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScopeKey {
    /// The current user's channel list.
    Channels,
    /// The global user list.
    Users,
    /// One channel's message history, by channel URL.
    Messages(String),
}

impl ScopeKey {
    /// Message-history scope for `channel_url`.
    pub fn messages(channel_url: impl Into<String>) -> Self {
        Self::Messages(channel_url.into())
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Channels => f.write_str("channels"),
            Self::Users => f.write_str("users"),
            Self::Messages(url) => write!(f, "messages:{url}"),
        }
    }
}

/// Result of asking a cursor for its next page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome<T> {
    /// The next batch of items.
    Page(Vec<T>),
    /// The backend reported no further pages. Stays this way until the
    /// scope is invalidated.
    Exhausted,
    /// A fetch for this scope is already running.
    InFlight,
}

impl<T> PageOutcome<T> {
    /// The fetched items, or `None` for the no-op outcomes.
    pub fn into_page(self) -> Option<Vec<T>> {
        match self {
            Self::Page(items) => Some(items),
            Self::Exhausted | Self::InFlight => None,
        }
    }
}

/// Snapshot of a cursor's flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorState {
    /// Scope the cursor pages through.
    pub scope: ScopeKey,
    /// Whether another page may exist.
    pub has_more: bool,
    /// Whether a fetch is running.
    pub is_loading: bool,
    /// Requested page size; `None` when the backend default applies.
    pub page_size: Option<usize>,
}

struct Cursor<T> {
    /// `None` while a fetch holds the query.
    query: Option<Box<dyn PageQuery<T>>>,
    has_more: bool,
    is_loading: bool,
    page_size: Option<usize>,
    /// Distinguishes this cursor from a replacement created after an
    /// invalidate, so a late fetch cannot write into the new one.
    generation: u64,
}

type Table<T> = Mutex<HashMap<ScopeKey, Cursor<T>>>;

fn lock<T>(table: &Table<T>) -> MutexGuard<'_, HashMap<ScopeKey, Cursor<T>>> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owns every live cursor for one client.
pub struct CursorRegistry {
    backend: Arc<dyn ChatBackend>,
    channels: Table<ChannelRecord>,
    users: Table<UserRecord>,
    messages: Table<MessageRecord>,
    generation: AtomicU64,
}

impl CursorRegistry {
    /// Create an empty registry.
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            channels: Mutex::new(HashMap::new()),
            users: Mutex::new(HashMap::new()),
            messages: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// Next page of the current user's channels, including empty ones.
    pub async fn fetch_channels(&self) -> ClientResult<PageOutcome<ChannelRecord>> {
        let backend = Arc::clone(&self.backend);
        self.fetch(&self.channels, ScopeKey::Channels, Some(PAGE_SIZE), move || {
            backend.channel_list_query(ChannelListParams {
                include_empty: true,
                limit: PAGE_SIZE,
            })
        })
        .await
    }

    /// Next page of the global user list.
    pub async fn fetch_users(&self) -> ClientResult<PageOutcome<UserRecord>> {
        let backend = Arc::clone(&self.backend);
        self.fetch(&self.users, ScopeKey::Users, None, move || {
            backend.user_list_query()
        })
        .await
    }

    /// Next (older) page of `channel`'s message history.
    ///
    /// The query is built from `channel` on first use and reused until the
    /// scope for its URL is invalidated.
    pub async fn fetch_messages(
        &self,
        channel: &ChannelRecord,
    ) -> ClientResult<PageOutcome<MessageRecord>> {
        let backend = Arc::clone(&self.backend);
        let scope = ScopeKey::messages(channel.channel_url.as_str());
        self.fetch(&self.messages, scope, Some(PAGE_SIZE), move || {
            backend.previous_message_query(
                channel,
                MessageListParams {
                    limit: PAGE_SIZE,
                    reverse: false,
                },
            )
        })
        .await
    }

    async fn fetch<T, F>(
        &self,
        table: &Table<T>,
        scope: ScopeKey,
        page_size: Option<usize>,
        build: F,
    ) -> ClientResult<PageOutcome<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> Box<dyn PageQuery<T>> + Send,
    {
        if self.backend.current_user().is_none() {
            return Err(ClientError::NotConnected("fetch_page"));
        }

        let (mut query, generation) = {
            let mut cursors = lock(table);
            let cursor = cursors.entry(scope.clone()).or_insert_with(|| {
                debug!(%scope, "Creating cursor");
                Cursor {
                    query: Some(build()),
                    has_more: true,
                    is_loading: false,
                    page_size,
                    generation: self.generation.fetch_add(1, Ordering::Relaxed),
                }
            });

            if !cursor.has_more {
                trace!(%scope, "Cursor exhausted");
                return Ok(PageOutcome::Exhausted);
            }
            if cursor.is_loading {
                trace!(%scope, "Fetch already in flight");
                return Ok(PageOutcome::InFlight);
            }
            let Some(query) = cursor.query.take() else {
                return Ok(PageOutcome::InFlight);
            };
            cursor.is_loading = true;
            (query, cursor.generation)
        };

        let result = query.next_page().await;

        {
            let mut cursors = lock(table);
            match cursors.get_mut(&scope) {
                Some(cursor) if cursor.generation == generation => {
                    cursor.has_more = query.has_more();
                    cursor.is_loading = query.is_loading();
                    cursor.query = Some(query);
                },
                _ => debug!(%scope, "Cursor invalidated during fetch, discarding query"),
            }
        }

        let items = result?;
        trace!(%scope, count = items.len(), "Fetched page");
        Ok(PageOutcome::Page(items))
    }

    /// Drop the cursor for `scope`. Returns whether one existed.
    pub fn invalidate(&self, scope: &ScopeKey) -> bool {
        let removed = match scope {
            ScopeKey::Channels => lock(&self.channels).remove(scope).is_some(),
            ScopeKey::Users => lock(&self.users).remove(scope).is_some(),
            ScopeKey::Messages(_) => lock(&self.messages).remove(scope).is_some(),
        };
        if removed {
            debug!(%scope, "Cursor invalidated");
        }
        removed
    }

    /// Drop every cursor.
    pub fn invalidate_all(&self) {
        lock(&self.channels).clear();
        lock(&self.users).clear();
        lock(&self.messages).clear();
        debug!("All cursors invalidated");
    }

    /// Flags of the cursor for `scope`, if one exists.
    pub fn state(&self, scope: &ScopeKey) -> Option<CursorState> {
        match scope {
            ScopeKey::Channels => snapshot(&self.channels, scope),
            ScopeKey::Users => snapshot(&self.users, scope),
            ScopeKey::Messages(_) => snapshot(&self.messages, scope),
        }
    }
}

fn snapshot<T>(table: &Table<T>, scope: &ScopeKey) -> Option<CursorState> {
    lock(table).get(scope).map(|cursor| CursorState {
        scope: scope.clone(),
        has_more: cursor.has_more,
        is_loading: cursor.is_loading,
        page_size: cursor.page_size,
    })
}
