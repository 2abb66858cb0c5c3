//! Identity exchange: local user ID → chat backend credentials.

use std::fmt;

use async_trait::async_trait;
use parley_config::{IdentitySection, IdentitySource};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, error};

use crate::error::{ClientError, ClientResult};

/// Backend user ID and access token for one connection.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Backend user ID.
    pub user_id: String,
    /// Backend access token.
    pub access_token: String,
}

impl Credentials {
    /// Build credentials from raw values, trimming surrounding whitespace.
    ///
    /// Either value being empty after trimming is an
    /// [`ClientError::IdentityPayload`].
    pub fn new(user_id: &str, access_token: &str) -> ClientResult<Self> {
        let user_id = user_id.trim();
        let access_token = access_token.trim();
        if user_id.is_empty() {
            return Err(ClientError::IdentityPayload("user id is empty".to_string()));
        }
        if access_token.is_empty() {
            return Err(ClientError::IdentityPayload(
                "access token is empty".to_string(),
            ));
        }
        Ok(Self {
            user_id: user_id.to_string(),
            access_token: access_token.to_string(),
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_id", &self.user_id)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Resolves a local user ID to backend credentials.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Resolve `local_user_id`. Called once per connect attempt.
    async fn resolve(&self, local_user_id: &str) -> ClientResult<Credentials>;
}

/// A [`CredentialSource`] that hands out pre-issued credentials.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    credentials: Credentials,
}

impl StaticCredentials {
    /// Wrap already-issued credentials.
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl CredentialSource for StaticCredentials {
    async fn resolve(&self, _local_user_id: &str) -> ClientResult<Credentials> {
        Ok(self.credentials.clone())
    }
}

/// Exchanges local user IDs over HTTP.
///
/// Issues a single `GET {base_url}/users/{local_user_id}` per resolve and
/// parses the body with the schema named by [`IdentitySource`]. No timeout
/// is set on the request and failures are never retried.
#[derive(Debug, Clone)]
pub struct HttpIdentityExchange {
    client: Client,
    base_url: Url,
    source: IdentitySource,
}

impl HttpIdentityExchange {
    /// Create an exchange against `base_url`.
    pub fn new(base_url: &str, source: IdentitySource) -> ClientResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::Config(format!("invalid identity base url: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Config(format!(
                "identity base url '{base_url}' cannot carry a path"
            )));
        }
        Ok(Self {
            client: Client::new(),
            base_url,
            source,
        })
    }

    /// Create an exchange from the `[identity]` config section.
    pub fn from_config(section: &IdentitySection) -> ClientResult<Self> {
        let base_url = section
            .base_url
            .as_deref()
            .ok_or_else(|| ClientError::Config("identity.base_url is not set".to_string()))?;
        Self::new(base_url, section.source)
    }

    /// Use a preconfigured HTTP client.
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// The response schema this exchange expects.
    pub fn source(&self) -> IdentitySource {
        self.source
    }

    /// `{base_url}/users/{local_user_id}`, with the ID percent-encoded as a
    /// single path segment.
    fn user_url(&self, local_user_id: &str) -> ClientResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                ClientError::Config(format!(
                    "identity base url '{}' cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .push("users")
            .push(local_user_id);
        Ok(url)
    }
}

#[async_trait]
impl CredentialSource for HttpIdentityExchange {
    async fn resolve(&self, local_user_id: &str) -> ClientResult<Credentials> {
        let url = self.user_url(local_user_id)?;
        debug!(%url, source = %self.source, "Exchanging local user id");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            error!(status = %status, "Identity exchange error");
            return Err(ClientError::IdentityStatus(status.as_u16()));
        }

        let body = response.bytes().await?;
        parse_credentials(self.source, &body)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatV1Envelope {
    service: ChatV1Service,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatV1Service {
    external_user: ChatV1User,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatV1User {
    user_id: String,
    access_token: ChatV1Token,
}

#[derive(Deserialize)]
struct ChatV1Token {
    token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AwsEnvelope {
    send_bird_user_id: String,
    send_bird_user_token: String,
}

/// Parse an identity-exchange body with the parser for `source`.
pub fn parse_credentials(source: IdentitySource, body: &[u8]) -> ClientResult<Credentials> {
    let invalid = |e: serde_json::Error| ClientError::IdentityPayload(format!("{source}: {e}"));

    match source {
        IdentitySource::ChatV1 => {
            let envelope: ChatV1Envelope = serde_json::from_slice(body).map_err(invalid)?;
            let user = envelope.service.external_user;
            Credentials::new(&user.user_id, &user.access_token.token)
        },
        IdentitySource::Aws => {
            let envelope: AwsEnvelope = serde_json::from_slice(body).map_err(invalid)?;
            Credentials::new(&envelope.send_bird_user_id, &envelope.send_bird_user_token)
        },
    }
}
