//! Parley Core - the chat backend contract.
//!
//! This crate defines everything the client layer needs to know about the
//! remote chat SDK, and nothing more:
//!
//! - Record types mirrored from the backend ([`ChannelRecord`],
//!   [`MessageRecord`], [`UserRecord`])
//! - The [`ChatBackend`] trait the client drives
//! - The [`PageQuery`] capability wrapping the SDK's stateful list queries
//! - Push events ([`PushEvent`]) delivered through a [`PushSink`]
//! - [`BackendError`] for transport failures
//!
//! It performs no I/O. Concrete SDK bindings implement [`ChatBackend`];
//! tests use the doubles in `parley-test`.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod backend;
pub mod error;
pub mod event;
pub mod types;

pub use backend::{
    ChannelListParams, ChatBackend, CreateChannelParams, FileUpload, MessageListParams,
    PageQuery, ThumbnailSize,
};
pub use error::{BackendError, BackendResult};
pub use event::{EventKind, PushEvent, PushSink};
pub use types::{ChannelRecord, MessageId, MessageKind, MessageRecord, UserRecord};
