//! Configuration types for the Parley client.
//!
//! Every struct implements [`Default`] with the built-in values so that a
//! bare `[section]` header in TOML produces a working configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration for the Parley client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Identity-exchange endpoint and response schema.
    pub identity: IdentitySection,
    /// Chat application and display settings.
    pub chat: ChatSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// IdentitySection
// ---------------------------------------------------------------------------

/// Response schema of the identity-exchange endpoint.
///
/// Selected by configuration, never detected from the response body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentitySource {
    /// `{ service: { externalUser: { userId, accessToken: { token } } } }`
    #[default]
    #[serde(rename = "chat-v1")]
    ChatV1,
    /// `{ sendBirdUserId, sendBirdUserToken }`
    #[serde(rename = "aws")]
    Aws,
}

impl IdentitySource {
    /// The configuration spelling of this source.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ChatV1 => "chat-v1",
            Self::Aws => "aws",
        }
    }
}

impl fmt::Display for IdentitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where and how local user IDs are exchanged for chat credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentitySection {
    /// Base URL of the exchange service; `/users/{id}` is appended.
    pub base_url: Option<String>,
    /// Response schema the service speaks.
    pub source: IdentitySource,
}

// ---------------------------------------------------------------------------
// ChatSection
// ---------------------------------------------------------------------------

/// Chat application and display settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSection {
    /// Backend application ID.
    pub app_id: String,
    /// Largest member count shown as a number.
    pub member_count_cap: u32,
    /// Label shown instead of counts above `member_count_cap`.
    pub max_count_label: String,
}

impl Default for ChatSection {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            member_count_cap: 9,
            max_count_label: "9+".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"`, or `"full"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["parley_client=debug"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "pretty".to_owned(),
            directives: Vec::new(),
        }
    }
}
