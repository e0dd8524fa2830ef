//! The session manager: bootstrap, resume, and supervision of one client
//! session.
//!
//! The manager coordinates the identity store, the protocol-client
//! factory, and the status state machine into a single deterministic
//! lifecycle. All shared state (status, selected homeserver, client,
//! credential) is mutated here and nowhere else; bootstrap, resume, and
//! logout are mutually exclusive critical sections gated by the status
//! value.

use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use vestibule_client::{
    ClientConfig, ClientError, ClientFactory, ProtocolClient, SyncPhase, VerificationMethod,
};
use vestibule_core::{
    AccessToken, Homeserver, LoginFlow, SessionStatus, StatusHandle, StatusReceiver, UserId,
};
use vestibule_store::{IdentityStore, IdentityStoreExt};

use crate::error::{Result, SessionError};
use crate::validator::HomeserverValidator;

/// Configuration for the session manager.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Timeout applied to each individual network query (validation,
    /// version check, identity query). Expiry surfaces as the ordinary
    /// failure of that step, not a distinct error kind.
    pub request_timeout: Duration,
    /// Verification methods the session client should advertise.
    pub verification_methods: Vec<VerificationMethod>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            verification_methods: vec![VerificationMethod::Sas],
        }
    }
}

/// The session manager.
///
/// Generic over the identity store and the client factory so tests can
/// substitute in-memory implementations for both.
pub struct SessionManager<S: IdentityStore, F: ClientFactory> {
    /// Durable identity persistence.
    store: Arc<S>,
    /// Constructs protocol clients, throwaway and real.
    factory: Arc<F>,
    /// Configuration.
    config: SessionConfig,
    /// The observable lifecycle phase; sole mutation point for status.
    status: StatusHandle,
    /// The active client session, if one was constructed.
    client: RwLock<Option<Arc<dyn ProtocolClient>>>,
    /// The user the credential resolved to, bound during resume.
    current_user: RwLock<Option<UserId>>,
    /// Last successfully discovered login flows, for display only.
    cached_flows: RwLock<Vec<LoginFlow>>,
    /// The one-shot ready observer, kept for cancellation.
    ready_observer: Mutex<Option<JoinHandle<()>>>,
}

impl<S: IdentityStore, F: ClientFactory> SessionManager<S, F> {
    /// Create a manager over the given store and factory.
    pub fn new(store: S, factory: F, config: SessionConfig) -> Self {
        Self {
            store: Arc::new(store),
            factory: Arc::new(factory),
            config,
            status: StatusHandle::new(),
            client: RwLock::new(None),
            current_user: RwLock::new(None),
            cached_flows: RwLock::new(Vec::new()),
            ready_observer: Mutex::new(None),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Observability
    // ─────────────────────────────────────────────────────────────────────────

    /// The current lifecycle phase.
    pub fn status(&self) -> SessionStatus {
        self.status.current()
    }

    /// Subscribe to lifecycle transitions.
    pub fn subscribe_status(&self) -> StatusReceiver {
        self.status.subscribe()
    }

    /// The user bound to the session, once resume has confirmed the
    /// credential.
    pub fn current_user(&self) -> Option<UserId> {
        self.current_user.read().unwrap().clone()
    }

    /// Whether a client session has been constructed.
    pub fn has_active_client(&self) -> bool {
        self.client.read().unwrap().is_some()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Homeserver Registry
    // ─────────────────────────────────────────────────────────────────────────

    /// The known homeservers, in insertion order.
    pub async fn known_homeservers(&self) -> Result<Vec<Homeserver>> {
        Ok(self.store.known_homeservers().await?)
    }

    /// The selected homeserver, if any.
    pub async fn selected_homeserver(&self) -> Result<Option<Homeserver>> {
        Ok(self.store.selected_homeserver().await?)
    }

    /// Register a homeserver by URL.
    ///
    /// Lookups by URL short-circuit insertion: adding a known URL returns
    /// the existing entry untouched.
    pub async fn add_homeserver(&self, url: &str, favorite: bool) -> Result<Homeserver> {
        let mut known = self.store.known_homeservers().await?;
        if let Some(existing) = known.iter().find(|hs| hs.url == url) {
            return Ok(existing.clone());
        }

        let homeserver = Homeserver::from_url(url).favorite(favorite);
        known.push(homeserver.clone());
        self.store.save_known_homeservers(&known).await?;
        Ok(homeserver)
    }

    /// Select the homeserver to connect to, registering it first if it is
    /// not yet known. Find-or-insert plus selection is atomic from the
    /// caller's perspective.
    pub async fn select_homeserver(&self, url: &str) -> Result<Homeserver> {
        let homeserver = self.add_homeserver(url, false).await?;
        self.store
            .save_selected_homeserver(Some(&homeserver))
            .await?;
        Ok(homeserver)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Validation
    // ─────────────────────────────────────────────────────────────────────────

    /// Probe whether `url` serves a compatible protocol endpoint.
    ///
    /// Uses a throwaway unauthenticated client; never touches session
    /// state.
    pub async fn validate_homeserver(&self, url: &str) -> bool {
        HomeserverValidator::new(Arc::clone(&self.factory), self.config.request_timeout)
            .validate(url)
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Bootstrap
    // ─────────────────────────────────────────────────────────────────────────

    /// Bootstrap a session against the selected homeserver.
    ///
    /// Constructs a client bound to the persisted identity, re-validates
    /// the server through it, then attempts a silent resume if a
    /// credential is stored. With no credential, the session is left at
    /// idle with a constructed client so the caller can drive manual
    /// authentication and call [`SessionManager::resume`] afterwards.
    ///
    /// Any failure before the resume step rolls the session back to a
    /// clean unauthenticated state: no selected homeserver, no client,
    /// status idle. A silent-resume failure is logged and swallowed;
    /// the session returns to idle for manual login instead.
    pub async fn bootstrap(&self) -> Result<()> {
        // Fast rejection while another bootstrap holds the session.
        let current = self.status();
        if current.is_busy() {
            return Err(SessionError::BootstrapInProgress(current));
        }

        let selected = self
            .store
            .selected_homeserver()
            .await?
            .ok_or(SessionError::NoHomeserverSelected)?;

        self.status
            .begin_connecting()
            .map_err(SessionError::BootstrapInProgress)?;

        // One session per process: a re-bootstrap from ready or idle
        // replaces whatever client the previous attempt left behind.
        self.abort_ready_observer();
        let previous = self.client.write().unwrap().take();
        if let Some(previous) = previous {
            previous.stop().await;
        }

        let token = match self.store.access_token().await {
            Ok(token) => token,
            Err(err) => {
                self.rollback().await;
                return Err(err.into());
            }
        };

        let client = match self.connect(&selected, token.clone()).await {
            Ok(client) => client,
            Err(err) => {
                self.rollback().await;
                return Err(err);
            }
        };
        *self.client.write().unwrap() = Some(client);

        if token.is_some() {
            // Silent resume: failure falls back to manual login.
            if let Err(err) = self.resume().await {
                tracing::warn!(error = %err, "silent session resume failed; awaiting manual login");
            }
        } else {
            self.status.transition(SessionStatus::Idle);
        }

        Ok(())
    }

    /// Construct the session client and re-validate the server through it.
    async fn connect(
        &self,
        homeserver: &Homeserver,
        token: Option<AccessToken>,
    ) -> Result<Arc<dyn ProtocolClient>> {
        let device_id = self.store.device_id_or_generate().await?;

        let config = ClientConfig::new(&homeserver.url, device_id)
            .with_access_token(token)
            .with_verification_methods(self.config.verification_methods.clone());

        let client = self
            .factory
            .create(config)
            .await
            .map_err(SessionError::ClientConstructionFailed)?;

        // Validation runs against the live client, not the throwaway
        // probe a selection UI may have used earlier.
        let compatible = match timeout(self.config.request_timeout, client.server_versions()).await
        {
            Ok(Ok(versions)) => versions.is_compatible(),
            Ok(Err(err)) => {
                tracing::debug!(homeserver = %homeserver.name, error = %err, "version query failed");
                false
            }
            Err(_) => {
                tracing::debug!(homeserver = %homeserver.name, "version query timed out");
                false
            }
        };

        if !compatible {
            client.stop().await;
            return Err(SessionError::InvalidHomeserver {
                name: homeserver.name.clone(),
            });
        }

        Ok(client)
    }

    /// Roll the session back to a clean unauthenticated state.
    ///
    /// Unconditional and idempotent: safe to call with any subset of the
    /// session already torn down.
    async fn rollback(&self) {
        self.abort_ready_observer();

        let client = self.client.write().unwrap().take();
        if let Some(client) = client {
            client.stop().await;
        }

        *self.current_user.write().unwrap() = None;

        if let Err(err) = self.store.save_selected_homeserver(None).await {
            tracing::warn!(error = %err, "failed to clear selected homeserver during rollback");
        }

        self.status.transition(SessionStatus::Idle);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Resume
    // ─────────────────────────────────────────────────────────────────────────

    /// Resume an authenticated session on the constructed client.
    ///
    /// Confirms the credential, binds the resolved user, and starts the
    /// synchronization loop. Returning `Ok` does not imply ready: the
    /// ready transition arrives asynchronously once the client reports
    /// its first full synchronization.
    ///
    /// On failure the status falls back to idle; a rejected credential is
    /// cleared from the store and surfaces as
    /// [`SessionError::AuthenticationExpired`].
    pub async fn resume(&self) -> Result<()> {
        match self.try_resume().await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.abort_ready_observer();
                self.status.transition(SessionStatus::Idle);
                Err(err)
            }
        }
    }

    async fn try_resume(&self) -> Result<()> {
        let client = self
            .client
            .read()
            .unwrap()
            .clone()
            .ok_or(SessionError::NoActiveSession)?;

        // Register the ready observer before anything can sync, so a fast
        // first sync cannot slip past it.
        self.install_ready_observer(&client);

        let account = match timeout(self.config.request_timeout, client.whoami()).await {
            Ok(Ok(account)) => account,
            Ok(Err(err)) if err.is_unauthorized() => {
                self.clear_access_token().await;
                return Err(SessionError::AuthenticationExpired);
            }
            Ok(Err(err)) => return Err(SessionError::Client(err)),
            Err(_) => {
                return Err(SessionError::Client(ClientError::Network(
                    "identity query timed out".into(),
                )))
            }
        };

        // A credential bound to some other device would sync under the
        // wrong encryption scope; reject it outright.
        if let Some(reported) = &account.device_id {
            let persisted = self.store.device_id().await?;
            if persisted.as_ref().is_some_and(|ours| ours != reported) {
                tracing::warn!(%reported, "credential is bound to a different device");
                self.clear_access_token().await;
                return Err(SessionError::AuthenticationExpired);
            }
        }

        *self.current_user.write().unwrap() = Some(account.user_id);
        self.status.transition(SessionStatus::Syncing);

        // Encryption is best-effort: a session without it still works in
        // reduced capacity.
        if let Err(err) = client.init_encryption().await {
            tracing::warn!(error = %err, "encryption init failed; continuing without e2ee");
        }

        // Warm the cache before going live so replay starts from warm
        // state instead of cold network-only state.
        if let Err(err) = client.warm_cache().await {
            tracing::warn!(error = %err, "cache warm-up failed; sync will start cold");
        }

        client.start_sync().await.map_err(SessionError::Client)?;
        Ok(())
    }

    /// Flip status to ready on the first prepared sync event, then detach.
    fn install_ready_observer(&self, client: &Arc<dyn ProtocolClient>) {
        let mut events = client.sync_events();
        let status = self.status.clone();

        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(SyncPhase::Prepared) => {
                        status.transition(SessionStatus::Ready);
                        break;
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => break,
                }
            }
        });

        if let Some(stale) = self.ready_observer.lock().unwrap().replace(handle) {
            stale.abort();
        }
    }

    fn abort_ready_observer(&self) {
        if let Some(observer) = self.ready_observer.lock().unwrap().take() {
            observer.abort();
        }
    }

    async fn clear_access_token(&self) {
        if let Err(err) = self.store.save_access_token(None).await {
            tracing::warn!(error = %err, "failed to clear rejected access token");
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Logout
    // ─────────────────────────────────────────────────────────────────────────

    /// Tear down the session and forget the homeserver selection.
    ///
    /// Safe to call from any status, repeatedly: each step is a no-op
    /// once its state is already cleared.
    pub async fn logout(&self) -> Result<()> {
        self.abort_ready_observer();

        let client = self.client.write().unwrap().take();
        if let Some(client) = client {
            client.stop().await;
        }

        *self.current_user.write().unwrap() = None;
        self.cached_flows.write().unwrap().clear();

        self.store.save_access_token(None).await?;
        self.store.save_selected_homeserver(None).await?;

        self.status.transition(SessionStatus::Idle);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Login Flows & Verification
    // ─────────────────────────────────────────────────────────────────────────

    /// Query the homeserver for its supported authentication methods.
    ///
    /// Returns the empty sequence, leaving the cache untouched, when no
    /// client session exists. Each call re-queries; the cache only serves
    /// display purposes via [`SessionManager::cached_login_flows`].
    pub async fn discover_login_flows(&self) -> Result<Vec<LoginFlow>> {
        let client = self.client.read().unwrap().clone();
        let Some(client) = client else {
            return Ok(Vec::new());
        };

        let flows = client.login_flows().await.map_err(SessionError::Client)?;
        *self.cached_flows.write().unwrap() = flows.clone();
        Ok(flows)
    }

    /// The most recently discovered login flows.
    pub fn cached_login_flows(&self) -> Vec<LoginFlow> {
        self.cached_flows.read().unwrap().clone()
    }

    /// Whether the current device is cross-signing-verified.
    ///
    /// `false`, never an error, when the client, its crypto subsystem,
    /// or the lookup is unavailable.
    pub async fn is_device_verified(&self) -> bool {
        let client = self.client.read().unwrap().clone();
        let Some(client) = client else {
            return false;
        };

        match client.device_verification().await {
            Ok(Some(verification)) => verification.is_verified(),
            Ok(None) => false,
            Err(err) => {
                tracing::debug!(error = %err, "device verification lookup unavailable");
                false
            }
        }
    }
}
