//! Connection lifecycle for the single client session.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use parley_core::{ChatBackend, UserRecord};
use tracing::{debug, info};

use crate::error::{ClientError, ClientResult};
use crate::identity::{CredentialSource, Credentials};

/// Where the session is in its connect/disconnect lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// No session, or the last connect attempt failed.
    #[default]
    Disconnected,
    /// Credentials are being resolved or the backend is connecting.
    Connecting,
    /// The backend accepted the credentials.
    Connected,
}

/// The local user's session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// ID the host application knows the user by.
    pub local_user_id: String,
    /// Display name supplied at connect time.
    pub display_name: String,
    /// Backend credentials, once resolved.
    pub credentials: Option<Credentials>,
    /// Lifecycle state.
    pub state: ConnectionState,
}

/// Owns the one session per client and drives connect/disconnect.
///
/// The session lock is never held across an `.await`.
pub struct SessionManager {
    backend: Arc<dyn ChatBackend>,
    credentials: Arc<dyn CredentialSource>,
    session: Mutex<Option<Session>>,
}

impl SessionManager {
    /// Create a manager with no session.
    pub fn new(backend: Arc<dyn ChatBackend>, credentials: Arc<dyn CredentialSource>) -> Self {
        Self {
            backend,
            credentials,
            session: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolve credentials for `local_user_id` and connect the backend.
    ///
    /// Rejected with [`ClientError::ConnectInProgress`] while another
    /// attempt is still connecting. On failure the previous session is put
    /// back if its connection is still live; otherwise the session is
    /// dropped, leaving the state `Disconnected`. Nothing is retried.
    pub async fn connect(&self, local_user_id: &str, display_name: &str) -> ClientResult<UserRecord> {
        let previous = self.begin_connect(local_user_id, display_name)?;

        match self.establish(local_user_id).await {
            Ok((credentials, user)) => {
                if let Some(session) = self.lock().as_mut() {
                    session.credentials = Some(credentials);
                    session.state = ConnectionState::Connected;
                }
                info!(local_user_id, user_id = %user.user_id, "Session connected");
                Ok(user)
            },
            Err(e) => {
                let live = self.is_connected();
                *self.lock() = previous.filter(|_| live);
                Err(e)
            },
        }
    }

    fn begin_connect(
        &self,
        local_user_id: &str,
        display_name: &str,
    ) -> ClientResult<Option<Session>> {
        let mut guard = self.lock();
        if guard
            .as_ref()
            .is_some_and(|s| s.state == ConnectionState::Connecting)
        {
            return Err(ClientError::ConnectInProgress);
        }
        Ok(guard.replace(Session {
            local_user_id: local_user_id.to_string(),
            display_name: display_name.to_string(),
            credentials: None,
            state: ConnectionState::Connecting,
        }))
    }

    async fn establish(&self, local_user_id: &str) -> ClientResult<(Credentials, UserRecord)> {
        let credentials = self.credentials.resolve(local_user_id).await?;
        debug!(local_user_id, user_id = %credentials.user_id, "Credentials resolved");

        let user = self
            .backend
            .connect(&credentials.user_id, &credentials.access_token)
            .await?;
        Ok((credentials, user))
    }

    /// Disconnect the backend and drop the session.
    ///
    /// Returns `Ok(false)` without touching anything when not connected.
    /// The session is dropped even if the backend reports an error.
    pub async fn disconnect(&self) -> ClientResult<bool> {
        if !self.is_connected() {
            debug!("Disconnect requested while not connected");
            return Ok(false);
        }

        let result = self.backend.disconnect().await;
        *self.lock() = None;
        result?;
        info!("Session disconnected");
        Ok(true)
    }

    /// Whether the backend has a live current user.
    pub fn is_connected(&self) -> bool {
        self.backend.current_user().is_some()
    }

    /// The session's lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.lock()
            .as_ref()
            .map_or(ConnectionState::Disconnected, |s| s.state)
    }

    /// A snapshot of the session, if one exists.
    pub fn session(&self) -> Option<Session> {
        self.lock().clone()
    }

    /// The backend's current user.
    pub fn current_user(&self) -> Option<UserRecord> {
        self.backend.current_user()
    }

    /// Whether `user` is the connected user.
    pub fn is_current_user(&self, user: &UserRecord) -> bool {
        self.current_user()
            .is_some_and(|current| current.user_id == user.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parley_core::BackendError;
    use parley_test::{BackendCall, MockBackend, test_user};

    struct FailingSource;

    #[async_trait]
    impl CredentialSource for FailingSource {
        async fn resolve(&self, _local_user_id: &str) -> ClientResult<Credentials> {
            Err(ClientError::IdentityPayload("missing field".to_string()))
        }
    }

    fn static_source() -> Arc<dyn CredentialSource> {
        Arc::new(crate::identity::StaticCredentials::new(
            Credentials::new("sb-1", "tok-1").unwrap(),
        ))
    }

    #[tokio::test]
    async fn connect_transitions_to_connected() {
        let backend = Arc::new(MockBackend::new());
        let manager = SessionManager::new(backend.clone(), static_source());
        assert_eq!(manager.state(), ConnectionState::Disconnected);

        let user = manager.connect("guest-1", "Guest").await.unwrap();
        assert_eq!(user.user_id, "sb-1");
        assert_eq!(manager.state(), ConnectionState::Connected);
        assert!(manager.is_connected());

        let session = manager.session().unwrap();
        assert_eq!(session.local_user_id, "guest-1");
        assert_eq!(session.display_name, "Guest");
        assert_eq!(session.credentials.unwrap().access_token, "tok-1");
        assert_eq!(
            backend.calls(),
            vec![BackendCall::Connect {
                user_id: "sb-1".into(),
                access_token: "tok-1".into()
            }]
        );
    }

    #[tokio::test]
    async fn exchange_failure_abandons_connect() {
        let backend = Arc::new(MockBackend::new());
        let manager = SessionManager::new(backend.clone(), Arc::new(FailingSource));

        let err = manager.connect("guest-1", "Guest").await.unwrap_err();
        assert!(matches!(err, ClientError::IdentityPayload(_)));
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert!(manager.session().is_none());
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn backend_failure_rolls_back() {
        let backend = Arc::new(MockBackend::new());
        backend.fail_next("connect", BackendError::Transport("refused".into()));
        let manager = SessionManager::new(backend.clone(), static_source());

        let err = manager.connect("guest-1", "Guest").await.unwrap_err();
        assert!(matches!(err, ClientError::Backend(_)));
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert!(!manager.is_connected());
    }

    #[tokio::test]
    async fn failed_reconnect_keeps_live_session() {
        let backend = Arc::new(MockBackend::new());
        let manager = SessionManager::new(backend.clone(), static_source());
        manager.connect("guest-1", "Guest").await.unwrap();

        backend.fail_next("connect", BackendError::Transport("refused".into()));
        assert!(manager.connect("guest-2", "Other").await.is_err());

        assert!(manager.is_connected());
        assert_eq!(manager.state(), ConnectionState::Connected);
        let session = manager.session().unwrap();
        assert_eq!(session.local_user_id, "guest-1");
        assert_eq!(session.display_name, "Guest");
        assert_eq!(session.credentials.unwrap().user_id, "sb-1");
    }

    #[tokio::test]
    async fn failed_reconnect_after_backend_drop_disconnects() {
        let backend = Arc::new(MockBackend::new());
        let manager = SessionManager::new(backend.clone(), static_source());
        manager.connect("guest-1", "Guest").await.unwrap();

        backend.set_current_user(None);
        backend.fail_next("connect", BackendError::Transport("refused".into()));
        assert!(manager.connect("guest-1", "Guest").await.is_err());

        assert!(!manager.is_connected());
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert!(manager.session().is_none());
    }

    #[tokio::test]
    async fn second_connect_while_connecting_is_rejected() {
        let backend = Arc::new(MockBackend::new());
        let gate = backend.hold_connect();
        let manager = Arc::new(SessionManager::new(backend.clone(), static_source()));

        let first = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.connect("guest-1", "Guest").await })
        };
        while manager.state() != ConnectionState::Connecting {
            tokio::task::yield_now().await;
        }

        let err = manager.connect("guest-1", "Guest").await.unwrap_err();
        assert!(matches!(err, ClientError::ConnectInProgress));

        gate.add_permits(1);
        assert!(first.await.unwrap().is_ok());
        assert_eq!(manager.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn disconnect_when_not_connected_is_noop() {
        let backend = Arc::new(MockBackend::new());
        let manager = SessionManager::new(backend.clone(), static_source());

        assert!(!manager.disconnect().await.unwrap());
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn disconnect_drops_session() {
        let backend = Arc::new(MockBackend::new());
        let manager = SessionManager::new(backend.clone(), static_source());
        manager.connect("guest-1", "Guest").await.unwrap();

        assert!(manager.disconnect().await.unwrap());
        assert!(manager.session().is_none());
        assert!(!manager.is_connected());
    }

    #[tokio::test]
    async fn is_current_user_compares_ids() {
        let backend = Arc::new(MockBackend::new());
        let manager = SessionManager::new(backend.clone(), static_source());
        assert!(!manager.is_current_user(&test_user("sb-1", "")));

        manager.connect("guest-1", "Guest").await.unwrap();
        assert!(manager.is_current_user(&test_user("sb-1", "Me")));
        assert!(!manager.is_current_user(&test_user("sb-2", "")));
    }
}
