//! Fan-out of server-pushed events to typed callbacks.
//!
//! One [`EventHandlers`] value is registered with the backend at a time,
//! under the fixed key [`GLOBAL_HANDLER`]. Events are dispatched
//! synchronously in the order the backend delivers them; an event whose slot
//! is empty is dropped.
//!
//! ```rust,ignore
//! let handlers = EventHandlers::new()
//!     .on_message_received(|channel, message| {
//!         println!("{}: {}", channel.channel_url, message.message);
//!     })
//!     .on_user_joined(|channel, user| {
//!         println!("{} joined {}", user.nickname, channel.channel_url);
//!     });
//! client.subscribe(handlers);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use parley_core::{
    ChannelRecord, ChatBackend, MessageId, MessageRecord, PushEvent, PushSink, UserRecord,
};
use tracing::{debug, trace};

/// Key the dispatcher's sink is registered under with the backend.
pub const GLOBAL_HANDLER: &str = "GLOBAL_HANDLER";

/// Callback for received and updated messages.
pub type OnMessageCallback = Arc<dyn Fn(&ChannelRecord, &MessageRecord) + Send + Sync>;

/// Callback for deleted messages.
pub type OnMessageDeletedCallback = Arc<dyn Fn(&ChannelRecord, MessageId) + Send + Sync>;

/// Callback for channel-level changes (properties, typing, read receipts).
pub type OnChannelCallback = Arc<dyn Fn(&ChannelRecord) + Send + Sync>;

/// Callback for membership changes.
pub type OnMemberCallback = Arc<dyn Fn(&ChannelRecord, &UserRecord) + Send + Sync>;

/// Typed push-event callbacks. Every slot is optional.
#[derive(Clone, Default)]
pub struct EventHandlers {
    on_message_received: Option<OnMessageCallback>,
    on_message_updated: Option<OnMessageCallback>,
    on_message_deleted: Option<OnMessageDeletedCallback>,
    on_channel_changed: Option<OnChannelCallback>,
    on_typing_status: Option<OnChannelCallback>,
    on_read_receipt: Option<OnChannelCallback>,
    on_user_left: Option<OnMemberCallback>,
    on_user_joined: Option<OnMemberCallback>,
}

impl fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandlers")
            .field("on_message_received", &self.on_message_received.is_some())
            .field("on_message_updated", &self.on_message_updated.is_some())
            .field("on_message_deleted", &self.on_message_deleted.is_some())
            .field("on_channel_changed", &self.on_channel_changed.is_some())
            .field("on_typing_status", &self.on_typing_status.is_some())
            .field("on_read_receipt", &self.on_read_receipt.is_some())
            .field("on_user_left", &self.on_user_left.is_some())
            .field("on_user_joined", &self.on_user_joined.is_some())
            .finish()
    }
}

impl EventHandlers {
    /// Create an empty set of handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// A message arrived in a channel.
    #[must_use]
    pub fn on_message_received(
        mut self,
        f: impl Fn(&ChannelRecord, &MessageRecord) + Send + Sync + 'static,
    ) -> Self {
        self.on_message_received = Some(Arc::new(f));
        self
    }

    /// A message was edited.
    #[must_use]
    pub fn on_message_updated(
        mut self,
        f: impl Fn(&ChannelRecord, &MessageRecord) + Send + Sync + 'static,
    ) -> Self {
        self.on_message_updated = Some(Arc::new(f));
        self
    }

    /// A message was deleted.
    #[must_use]
    pub fn on_message_deleted(
        mut self,
        f: impl Fn(&ChannelRecord, MessageId) + Send + Sync + 'static,
    ) -> Self {
        self.on_message_deleted = Some(Arc::new(f));
        self
    }

    /// Channel properties changed.
    #[must_use]
    pub fn on_channel_changed(mut self, f: impl Fn(&ChannelRecord) + Send + Sync + 'static) -> Self {
        self.on_channel_changed = Some(Arc::new(f));
        self
    }

    /// Someone started or stopped typing.
    #[must_use]
    pub fn on_typing_status(mut self, f: impl Fn(&ChannelRecord) + Send + Sync + 'static) -> Self {
        self.on_typing_status = Some(Arc::new(f));
        self
    }

    /// Read receipts changed.
    #[must_use]
    pub fn on_read_receipt(mut self, f: impl Fn(&ChannelRecord) + Send + Sync + 'static) -> Self {
        self.on_read_receipt = Some(Arc::new(f));
        self
    }

    /// A member left.
    #[must_use]
    pub fn on_user_left(
        mut self,
        f: impl Fn(&ChannelRecord, &UserRecord) + Send + Sync + 'static,
    ) -> Self {
        self.on_user_left = Some(Arc::new(f));
        self
    }

    /// A member joined.
    #[must_use]
    pub fn on_user_joined(
        mut self,
        f: impl Fn(&ChannelRecord, &UserRecord) + Send + Sync + 'static,
    ) -> Self {
        self.on_user_joined = Some(Arc::new(f));
        self
    }

    /// Route `event` to its slot. Returns `false` if the slot is empty.
    pub fn dispatch(&self, event: &PushEvent) -> bool {
        match event {
            PushEvent::MessageReceived { channel, message } => {
                invoke(self.on_message_received.as_ref(), |f| f(channel, message))
            },
            PushEvent::MessageUpdated { channel, message } => {
                invoke(self.on_message_updated.as_ref(), |f| f(channel, message))
            },
            PushEvent::MessageDeleted {
                channel,
                message_id,
            } => invoke(self.on_message_deleted.as_ref(), |f| f(channel, *message_id)),
            PushEvent::ChannelChanged { channel } => {
                invoke(self.on_channel_changed.as_ref(), |f| f(channel))
            },
            PushEvent::TypingStatusUpdated { channel } => {
                invoke(self.on_typing_status.as_ref(), |f| f(channel))
            },
            PushEvent::ReadReceiptUpdated { channel } => {
                invoke(self.on_read_receipt.as_ref(), |f| f(channel))
            },
            PushEvent::UserLeft { channel, user } => {
                invoke(self.on_user_left.as_ref(), |f| f(channel, user))
            },
            PushEvent::UserJoined { channel, user } => {
                invoke(self.on_user_joined.as_ref(), |f| f(channel, user))
            },
        }
    }
}

fn invoke<F: ?Sized>(slot: Option<&Arc<F>>, call: impl FnOnce(&F)) -> bool {
    match slot {
        Some(f) => {
            call(f);
            true
        },
        None => false,
    }
}

/// Identifies one `subscribe` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Owns the client's single event subscription.
pub struct EventDispatcher {
    backend: Arc<dyn ChatBackend>,
    current: Mutex<Option<SubscriptionId>>,
    next_id: AtomicU64,
}

impl EventDispatcher {
    /// Create a dispatcher with no subscription.
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            current: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<SubscriptionId>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `handlers`, replacing any existing subscription.
    pub fn subscribe(&self, handlers: EventHandlers) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let sink: PushSink = Arc::new(move |event: PushEvent| {
            let kind = event.kind();
            if handlers.dispatch(&event) {
                trace!(%kind, channel = %event.channel().channel_url, "Dispatched push event");
            } else {
                trace!(%kind, "No handler for push event, dropped");
            }
        });

        let mut current = self.lock();
        self.backend.set_push_handler(GLOBAL_HANDLER, sink);
        if current.replace(id).is_some() {
            debug!(?id, "Replaced event subscription");
        } else {
            debug!(?id, "Event subscription registered");
        }
        id
    }

    /// Remove the subscription. Returns `false` if there was none.
    pub fn unsubscribe(&self) -> bool {
        let mut current = self.lock();
        match current.take() {
            Some(id) => {
                self.backend.remove_push_handler(GLOBAL_HANDLER);
                debug!(?id, "Event subscription removed");
                true
            },
            None => false,
        }
    }

    /// Whether a subscription is registered.
    pub fn is_subscribed(&self) -> bool {
        self.lock().is_some()
    }

    /// ID of the current subscription.
    pub fn current(&self) -> Option<SubscriptionId> {
        *self.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_test::{BackendCall, MockBackend, test_channel, test_message, test_user};
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        (Arc::clone(&count), count)
    }

    fn user_joined() -> PushEvent {
        PushEvent::UserJoined {
            channel: test_channel("ch-1", &[]),
            user: test_user("u2", "Bob"),
        }
    }

    fn message_received(text: &str) -> PushEvent {
        PushEvent::MessageReceived {
            channel: test_channel("ch-1", &[]),
            message: test_message(1, "ch-1", text),
        }
    }

    #[test]
    fn empty_slot_drops_event() {
        let (seen, count) = counter();
        let handlers = EventHandlers::new().on_message_received(move |_, _| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!handlers.dispatch(&user_joined()));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn every_event_reaches_its_slot() {
        let (seen, count) = counter();
        let bump = move || {
            seen.fetch_add(1, Ordering::SeqCst);
        };
        let handlers = EventHandlers::new()
            .on_message_received({
                let bump = bump.clone();
                move |_, _| bump()
            })
            .on_message_updated({
                let bump = bump.clone();
                move |_, _| bump()
            })
            .on_message_deleted({
                let bump = bump.clone();
                move |_, id| {
                    assert_eq!(id, 9);
                    bump();
                }
            })
            .on_channel_changed({
                let bump = bump.clone();
                move |_| bump()
            })
            .on_typing_status({
                let bump = bump.clone();
                move |_| bump()
            })
            .on_read_receipt({
                let bump = bump.clone();
                move |_| bump()
            })
            .on_user_left({
                let bump = bump.clone();
                move |_, _| bump()
            })
            .on_user_joined(move |_, user| {
                assert_eq!(user.nickname, "Bob");
                bump();
            });

        let channel = test_channel("ch-1", &[]);
        let message = test_message(9, "ch-1", "hi");
        let events = vec![
            message_received("hi"),
            PushEvent::MessageUpdated {
                channel: channel.clone(),
                message,
            },
            PushEvent::MessageDeleted {
                channel: channel.clone(),
                message_id: 9,
            },
            PushEvent::ChannelChanged {
                channel: channel.clone(),
            },
            PushEvent::TypingStatusUpdated {
                channel: channel.clone(),
            },
            PushEvent::ReadReceiptUpdated {
                channel: channel.clone(),
            },
            PushEvent::UserLeft {
                channel,
                user: test_user("u3", ""),
            },
            user_joined(),
        ];
        for event in &events {
            assert!(handlers.dispatch(event));
        }
        assert_eq!(count.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn debug_shows_registered_slots() {
        let handlers = EventHandlers::new().on_typing_status(|_| {});
        let debug = format!("{handlers:?}");
        assert!(debug.contains("on_typing_status: true"));
        assert!(debug.contains("on_user_joined: false"));
    }

    #[test]
    fn subscribe_registers_under_global_key() {
        let backend = Arc::new(MockBackend::new());
        let dispatcher = EventDispatcher::new(backend.clone());
        let (seen, count) = counter();

        dispatcher.subscribe(EventHandlers::new().on_message_received(move |_, _| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(dispatcher.is_subscribed());
        assert!(backend.has_push_handler(GLOBAL_HANDLER));

        backend.emit(&message_received("hello"));
        backend.emit(&user_joined());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn events_dispatched_in_delivery_order() {
        let backend = Arc::new(MockBackend::new());
        let dispatcher = EventDispatcher::new(backend.clone());
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);

        dispatcher.subscribe(EventHandlers::new().on_message_received(move |_, message| {
            sink.lock().unwrap().push(message.message.clone());
        }));
        for text in ["one", "two", "three"] {
            backend.emit(&message_received(text));
        }
        assert_eq!(*log.lock().unwrap(), vec!["one", "two", "three"]);
    }

    #[test]
    fn resubscribe_replaces_previous_handlers() {
        let backend = Arc::new(MockBackend::new());
        let dispatcher = EventDispatcher::new(backend.clone());
        let (first_seen, first) = counter();
        let (second_seen, second) = counter();

        let a = dispatcher.subscribe(EventHandlers::new().on_message_received(move |_, _| {
            first_seen.fetch_add(1, Ordering::SeqCst);
        }));
        let b = dispatcher.subscribe(EventHandlers::new().on_message_received(move |_, _| {
            second_seen.fetch_add(1, Ordering::SeqCst);
        }));
        assert_ne!(a, b);
        assert_eq!(dispatcher.current(), Some(b));

        backend.emit(&message_received("hi"));
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let backend = Arc::new(MockBackend::new());
        let dispatcher = EventDispatcher::new(backend.clone());
        let (seen, count) = counter();
        dispatcher.subscribe(EventHandlers::new().on_message_received(move |_, _| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        assert!(dispatcher.unsubscribe());
        assert!(!dispatcher.unsubscribe());
        backend.emit(&message_received("late"));

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!dispatcher.is_subscribed());
        assert_eq!(
            backend
                .calls()
                .iter()
                .filter(|c| matches!(c, BackendCall::RemovePushHandler(_)))
                .count(),
            1
        );
    }
}
