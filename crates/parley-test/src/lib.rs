//! Parley Test - shared test utilities for the Parley chat client.
//!
//! This crate provides an in-memory [`MockBackend`] implementing
//! [`parley_core::ChatBackend`], the [`MockPageQuery`] it hands out, and
//! record fixtures. Use it as a dev-dependency:
//!
//! ```toml
//! [dev-dependencies]
//! parley-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! let backend = Arc::new(MockBackend::new().with_channel_pages(vec![
//!     vec![test_channel("ch-1", &[])],
//! ]));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![allow(clippy::missing_panics_doc)]

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
