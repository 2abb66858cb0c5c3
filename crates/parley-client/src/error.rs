//! Client error types.

use parley_core::BackendError;
use thiserror::Error;

/// Errors produced by the client layer.
///
/// The [`ChatClient`](crate::ChatClient) facade logs these and returns
/// `None`/`false`; the component types return them directly.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The chat backend reported a failure.
    #[error("chat backend error: {0}")]
    Backend(#[from] BackendError),

    /// The identity-exchange request could not be completed.
    #[error("identity exchange request failed: {0}")]
    IdentityRequest(#[from] reqwest::Error),

    /// The identity-exchange endpoint answered with a non-success status.
    #[error("identity exchange returned HTTP {0}")]
    IdentityStatus(u16),

    /// The identity-exchange body did not match the configured schema.
    #[error("identity exchange payload invalid: {0}")]
    IdentityPayload(String),

    /// An operation that needs a live connection ran without one.
    #[error("{0} requires a connected session")]
    NotConnected(&'static str),

    /// Another connect attempt has not settled yet.
    #[error("a connect attempt is already in progress")]
    ConnectInProgress,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience alias for results using [`ClientError`].
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_not_connected() {
        let err = ClientError::NotConnected("send_text");
        assert_eq!(err.to_string(), "send_text requires a connected session");
    }

    #[test]
    fn error_display_backend_wraps_source() {
        let err = ClientError::from(BackendError::Transport("socket closed".to_string()));
        assert_eq!(
            err.to_string(),
            "chat backend error: chat transport error: socket closed"
        );
    }

    #[test]
    fn error_display_identity_status() {
        let err = ClientError::IdentityStatus(503);
        assert_eq!(err.to_string(), "identity exchange returned HTTP 503");
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ClientError>();
    }
}
