//! Parley Client - session, pagination, and event dispatch over a remote
//! chat backend.
//!
//! - [`SessionManager`]: identity exchange and the connect/disconnect
//!   lifecycle
//! - [`CursorRegistry`]: lazy, single-flight pagination per scope
//! - [`EventDispatcher`]: one backend push subscription fanned out to typed
//!   [`EventHandlers`]
//! - [`Operations`]: single-request channel and message calls
//! - [`format`]: display strings for channels and messages
//! - [`ChatClient`]: all of the above behind a log-and-continue facade
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use parley_client::prelude::*;
//! use parley_config::Config;
//!
//! # async fn example(backend: Arc<dyn parley_core::ChatBackend>) -> Result<(), ClientError> {
//! let config = Config::load(None).map_err(|e| ClientError::Config(e.to_string()))?;
//! let client = ChatClient::from_config(backend, &config)?;
//!
//! if client.connect("guest-42", "Guest").await.is_some() {
//!     client.subscribe(EventHandlers::new().on_message_received(|channel, message| {
//!         println!("[{}] {}", channel.channel_url, message.message);
//!     }));
//!     while let Some(channels) = client.channels_page().await {
//!         for channel in &channels {
//!             println!("{} ({})", client.channel_name(channel), client.member_count(channel));
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod client;
pub mod cursor;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod identity;
pub mod operations;
pub mod session;

/// Prelude re-exports for convenient use.
pub mod prelude {
    pub use crate::client::{ChatClient, DisplaySettings};
    pub use crate::cursor::{CursorRegistry, CursorState, PageOutcome, ScopeKey};
    pub use crate::dispatch::{EventDispatcher, EventHandlers, GLOBAL_HANDLER, SubscriptionId};
    pub use crate::error::{ClientError, ClientResult};
    pub use crate::identity::{
        CredentialSource, Credentials, HttpIdentityExchange, StaticCredentials,
    };
    pub use crate::operations::Operations;
    pub use crate::session::{ConnectionState, Session, SessionManager};
}

// Re-export key types at crate root for convenience.
pub use client::{ChatClient, DisplaySettings};
pub use cursor::{CursorRegistry, PageOutcome, ScopeKey};
pub use dispatch::{EventDispatcher, EventHandlers, GLOBAL_HANDLER};
pub use error::{ClientError, ClientResult};
pub use identity::{CredentialSource, Credentials, HttpIdentityExchange, StaticCredentials};
pub use operations::Operations;
pub use session::{ConnectionState, SessionManager};
