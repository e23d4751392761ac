use crate::query_cache::QueryCache;
use discuss_core::config::{ClientConfig, DEFAULT_LANDING_ROUTE};
use discuss_core::credential::{
    CredentialStore, TOKEN_KEY, USER_KEY, clear_credentials, read_profile, write_profile,
};
use discuss_core::session::{Navigator, Session, SessionPhase};
use discuss_core::user::LoginPayload;
use discuss_core::Result;
use discuss_interaction::{ForumApi, UnauthorizedEvent};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Upper bound on the best-effort server logout call.
    pub logout_timeout: Duration,
    /// Route the navigator is sent to once logout cleanup is done.
    pub landing_route: String,
}

impl SessionOptions {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            logout_timeout: config.logout_timeout(),
            landing_route: config.landing_route.clone(),
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            logout_timeout: Duration::from_secs(5),
            landing_route: DEFAULT_LANDING_ROUTE.to_string(),
        }
    }
}

/// Owns the authentication state of the client.
///
/// The controller is the only writer of the credential store apart from the
/// transport dropping a rejected token. Observers read the current `Session`
/// through `snapshot()` or follow changes through `subscribe()`.
///
/// Every transition bumps an epoch. A profile verification that completes
/// after a newer transition (login, logout, unauthorized signal) is dropped.
pub struct SessionController {
    api: ForumApi,
    credentials: Arc<dyn CredentialStore>,
    cache: Arc<QueryCache>,
    navigator: Arc<dyn Navigator>,
    options: SessionOptions,
    state: watch::Sender<Session>,
    epoch: AtomicU64,
}

impl SessionController {
    pub fn new(
        api: ForumApi,
        credentials: Arc<dyn CredentialStore>,
        cache: Arc<QueryCache>,
        navigator: Arc<dyn Navigator>,
        options: SessionOptions,
    ) -> Self {
        Self {
            api,
            credentials,
            cache,
            navigator,
            options,
            state: watch::Sender::new(Session::default()),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Synchronous startup check against the credential store.
    ///
    /// A token with a readable cached profile is trusted optimistically until
    /// `verify` says otherwise. A token without a profile leaves the session
    /// loading and unauthenticated.
    pub fn initialize(&self) -> Session {
        self.begin_transition();
        let token = self.credentials.get(TOKEN_KEY);
        let user = token.as_ref().and_then(|_| read_profile(self.credentials.as_ref()));

        let phase = match (&token, &user) {
            (None, _) => SessionPhase::Anonymous,
            (Some(_), Some(_)) => SessionPhase::Authenticated,
            (Some(_), None) => SessionPhase::Verifying,
        };
        tracing::info!("[Session] Startup check: {}", phase);

        let session = Session { phase, user, token };
        self.state.send_replace(session.clone());
        session
    }

    /// Confirms the stored token against `GET /api/user`.
    ///
    /// # Errors
    ///
    /// Returns the transport error when verification fails. On `Unauthorized`
    /// the credentials are cleared; on any other failure the optimistic view
    /// is kept.
    pub async fn verify(&self) -> Result<Session> {
        let epoch = self.begin_transition();

        let Some(token) = self.credentials.get(TOKEN_KEY) else {
            tracing::debug!("[Session] No token to verify");
            self.clear_local_identity();
            self.state.send_replace(Session::anonymous());
            return Ok(self.snapshot());
        };

        self.state.send_modify(|session| {
            session.phase = SessionPhase::Verifying;
            session.token = Some(token.clone());
        });

        let result = self.api.fetch_profile().await;

        if !self.is_current(epoch) {
            tracing::debug!("[Session] Discarding stale profile verification");
            return Ok(self.snapshot());
        }

        match result {
            Ok(profile) => {
                if let Err(e) = write_profile(self.credentials.as_ref(), &profile) {
                    tracing::error!("[Session] Failed to cache verified profile: {}", e);
                }
                tracing::info!("[Session] Verified as {}", profile.username);
                self.state.send_replace(Session {
                    phase: SessionPhase::Authenticated,
                    user: Some(profile),
                    token: Some(token),
                });
                Ok(self.snapshot())
            }
            Err(e) if e.is_unauthorized() => {
                tracing::info!("[Session] Stored token rejected; signing out locally");
                self.clear_local_identity();
                self.state.send_replace(Session::anonymous());
                Err(e)
            }
            Err(e) => {
                tracing::warn!("[Session] Profile verification failed: {}", e);
                self.state.send_modify(|session| {
                    session.phase = if session.user.is_some() {
                        SessionPhase::Authenticated
                    } else {
                        SessionPhase::Anonymous
                    };
                });
                Err(e)
            }
        }
    }

    /// Re-runs profile verification on demand.
    pub async fn refresh(&self) -> Result<Session> {
        self.verify().await
    }

    /// Startup sequence: the synchronous check, then verification when a
    /// token exists. Verification failures are logged, not returned.
    pub async fn bootstrap(&self) -> Session {
        let session = self.initialize();
        if session.token.is_none() {
            return session;
        }
        match self.verify().await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("[Session] Bootstrap verification failed: {}", e);
                self.snapshot()
            }
        }
    }

    /// Adopts the identity returned by the login or registration endpoints.
    ///
    /// A missing payload is logged and ignored.
    pub async fn login(&self, payload: Option<LoginPayload>) -> Result<Session> {
        let Some(payload) = payload else {
            tracing::warn!("[Session] Login called without user info; ignoring");
            return Ok(self.snapshot());
        };
        self.begin_transition();

        if let Some(token) = &payload.token {
            self.credentials.set(TOKEN_KEY, token)?;
        }
        write_profile(self.credentials.as_ref(), &payload.profile)?;

        let token = self.credentials.get(TOKEN_KEY);
        if token.is_none() {
            tracing::warn!("[Session] Logged in without a bearer token");
        }
        tracing::info!("[Session] Logged in as {}", payload.profile.username);
        self.state.send_replace(Session {
            phase: SessionPhase::Authenticated,
            user: Some(payload.profile),
            token,
        });

        self.cache.invalidate_all().await;
        Ok(self.snapshot())
    }

    /// Ends the session. Local cleanup always happens, whatever the server says.
    pub async fn logout(&self) -> Session {
        self.begin_transition();
        let token = self.credentials.get(TOKEN_KEY);
        self.state.send_modify(|session| session.phase = SessionPhase::LoggingOut);

        if token.is_some() {
            match tokio::time::timeout(self.options.logout_timeout, self.api.logout()).await {
                Ok(Ok(())) => tracing::debug!("[Session] Server logout acknowledged"),
                Ok(Err(e)) => {
                    tracing::info!("[Session] Logout API call failed, cleaning up locally: {}", e)
                }
                Err(_) => tracing::info!(
                    "[Session] Logout API call timed out after {:?}, cleaning up locally",
                    self.options.logout_timeout
                ),
            }
        }

        self.finish_logout().await;
        self.snapshot()
    }

    /// Reacts to a 401 seen by the transport.
    ///
    /// # Returns
    ///
    /// `true` if the session was torn down, `false` if the signal was ignored
    /// because there was no identity to lose.
    pub async fn handle_unauthorized(&self, event: &UnauthorizedEvent) -> bool {
        let anonymous = {
            let session = self.state.borrow();
            session.phase == SessionPhase::Anonymous && session.user.is_none()
        };
        if anonymous && self.credentials.get(USER_KEY).is_none() {
            tracing::debug!(
                "[Session] Unauthorized on {} while anonymous; nothing to clear",
                event.path
            );
            return false;
        }

        tracing::info!("[Session] Unauthorized on {}; signing out", event.path);
        self.begin_transition();
        self.finish_logout().await;
        true
    }

    /// Listens to the transport's unauthorized signal for as long as the
    /// controller is alive.
    pub fn spawn_unauthorized_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let mut signal = self.api.transport().subscribe_unauthorized();
        let controller: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            loop {
                match signal.recv().await {
                    Ok(event) => {
                        let Some(controller) = controller.upgrade() else {
                            break;
                        };
                        controller.handle_unauthorized(&event).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("[Session] Missed {} unauthorized signal(s)", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            tracing::debug!("[Session] Unauthorized listener stopped");
        })
    }

    async fn finish_logout(&self) {
        self.clear_local_identity();
        self.cache.clear().await;
        self.state.send_replace(Session::anonymous());
        self.navigator.hard_navigate(&self.options.landing_route);
        tracing::info!("[Session] Signed out");
    }

    fn clear_local_identity(&self) {
        if let Err(e) = clear_credentials(self.credentials.as_ref()) {
            tracing::error!("[Session] Failed to clear credentials: {}", e);
        }
    }

    fn begin_transition(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }
}
