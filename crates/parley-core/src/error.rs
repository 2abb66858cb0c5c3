//! Backend error types.

use thiserror::Error;

/// Errors reported by a chat backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The transport failed before the backend answered.
    #[error("chat transport error: {0}")]
    Transport(String),

    /// The backend answered with an error.
    #[error("chat backend rejected request ({code}): {message}")]
    Rejected {
        /// Backend error code.
        code: u32,
        /// Backend error message.
        message: String,
    },

    /// The backend has no live connection.
    #[error("chat backend is not connected")]
    NotConnected,
}

/// Convenience alias for results using [`BackendError`].
pub type BackendResult<T> = Result<T, BackendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_transport() {
        let err = BackendError::Transport("socket closed".to_string());
        assert_eq!(err.to_string(), "chat transport error: socket closed");
    }

    #[test]
    fn error_display_rejected() {
        let err = BackendError::Rejected {
            code: 400_201,
            message: "channel not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "chat backend rejected request (400201): channel not found"
        );
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BackendError>();
    }
}
