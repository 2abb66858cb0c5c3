#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Configuration for the Parley chat client.
//!
//! A single [`Config`] type covers the identity-exchange endpoint, chat
//! display settings, and logging.
//!
//! # Usage
//!
//! ```rust,no_run
//! use parley_config::Config;
//!
//! let config = Config::load(Some(std::path::Path::new("parley.toml"))).unwrap();
//! println!("identity schema: {}", config.identity.source);
//! ```
//!
//! # Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Config file** passed to [`Config::load`]
//! 2. **Environment variables** (`PARLEY_*`), as fallbacks applied only
//!    to fields the file did not set
//! 3. **Embedded defaults** (`defaults.toml` compiled into the binary)

/// Configuration error types.
pub mod error;
/// Configuration file loading and env fallback.
pub mod loader;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use types::*;

impl Config {
    /// Load configuration: defaults, then `path` if given, then env fallbacks.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file is unreadable or malformed, or
    /// if the merged configuration fails validation.
    pub fn load(path: Option<&std::path::Path>) -> ConfigResult<Self> {
        loader::load(path, &loader::collect_env_vars())
    }

    /// Load configuration from a single file (no defaults, no env).
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
    /// validation.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }
}
