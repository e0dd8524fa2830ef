//! A scriptable in-memory protocol client for testing.
//!
//! Mirrors the shape of a real SDK client: every query answers from a
//! [`MockBehavior`] script, and sync phases are injected by the test
//! through [`MockClient::emit_sync`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use tokio::sync::broadcast;

use vestibule_core::{LoginFlow, UserId};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::sync::{SyncEvents, SyncPhase};
use crate::traits::{AccountInfo, ClientFactory, DeviceVerification, ProtocolClient};
use crate::versions::ServerVersions;

/// Scripted responses for a [`MockClient`].
///
/// The default is a healthy, compliant server with a valid credential.
#[derive(Debug, Clone)]
pub struct MockBehavior {
    pub server_versions: Result<ServerVersions>,
    pub whoami: Result<AccountInfo>,
    pub login_flows: Result<Vec<LoginFlow>>,
    pub init_encryption: Result<()>,
    pub device_verification: Result<Option<DeviceVerification>>,
    pub warm_cache: Result<()>,
    pub start_sync: Result<()>,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            server_versions: Ok(ServerVersions::from_versions(["v1.5", "v1.6"])),
            whoami: Ok(AccountInfo {
                user_id: UserId::new("@alice:example.org"),
                device_id: None,
            }),
            login_flows: Ok(vec![
                LoginFlow::new(LoginFlow::PASSWORD),
                LoginFlow::new(LoginFlow::SSO),
            ]),
            init_encryption: Ok(()),
            device_verification: Ok(Some(DeviceVerification::Unverified)),
            warm_cache: Ok(()),
            start_sync: Ok(()),
        }
    }
}

/// Per-method call counters for assertions.
#[derive(Debug, Default)]
pub struct CallCounts {
    pub server_versions: AtomicUsize,
    pub whoami: AtomicUsize,
    pub init_encryption: AtomicUsize,
    pub warm_cache: AtomicUsize,
    pub start_sync: AtomicUsize,
    pub stop: AtomicUsize,
}

/// In-memory protocol client driven by a [`MockBehavior`] script.
pub struct MockClient {
    config: ClientConfig,
    behavior: RwLock<MockBehavior>,
    sync_tx: broadcast::Sender<SyncPhase>,
    calls: CallCounts,
}

impl MockClient {
    /// Create a client with the given script.
    pub fn new(config: ClientConfig, behavior: MockBehavior) -> Self {
        let (sync_tx, _rx) = broadcast::channel(16);
        Self {
            config,
            behavior: RwLock::new(behavior),
            sync_tx,
            calls: CallCounts::default(),
        }
    }

    /// The configuration this client was constructed with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Call counters for assertions.
    pub fn calls(&self) -> &CallCounts {
        &self.calls
    }

    /// Rewrite the script mid-test.
    pub fn configure(&self, f: impl FnOnce(&mut MockBehavior)) {
        f(&mut self.behavior.write().unwrap());
    }

    /// Inject a sync phase into every subscriber.
    ///
    /// Returns the number of subscribers that received it.
    pub fn emit_sync(&self, phase: SyncPhase) -> usize {
        self.sync_tx.send(phase).unwrap_or(0)
    }

    fn script(&self) -> MockBehavior {
        self.behavior.read().unwrap().clone()
    }
}

#[async_trait]
impl ProtocolClient for MockClient {
    async fn server_versions(&self) -> Result<ServerVersions> {
        self.calls.server_versions.fetch_add(1, Ordering::SeqCst);
        self.script().server_versions
    }

    async fn whoami(&self) -> Result<AccountInfo> {
        self.calls.whoami.fetch_add(1, Ordering::SeqCst);
        self.script().whoami
    }

    async fn login_flows(&self) -> Result<Vec<LoginFlow>> {
        self.script().login_flows
    }

    async fn init_encryption(&self) -> Result<()> {
        self.calls.init_encryption.fetch_add(1, Ordering::SeqCst);
        self.script().init_encryption
    }

    async fn device_verification(&self) -> Result<Option<DeviceVerification>> {
        self.script().device_verification
    }

    fn sync_events(&self) -> SyncEvents {
        self.sync_tx.subscribe()
    }

    async fn warm_cache(&self) -> Result<()> {
        self.calls.warm_cache.fetch_add(1, Ordering::SeqCst);
        self.script().warm_cache
    }

    async fn start_sync(&self) -> Result<()> {
        self.calls.start_sync.fetch_add(1, Ordering::SeqCst);
        self.script().start_sync
    }

    async fn stop(&self) {
        self.calls.stop.fetch_add(1, Ordering::SeqCst);
        let _ = self.sync_tx.send(SyncPhase::Stopped);
    }
}

/// Factory producing [`MockClient`]s from a shared behavior template.
///
/// Keeps every constructed client reachable so tests can drive sync
/// events and inspect call counts after the session core took ownership.
pub struct MockFactory {
    template: Mutex<MockBehavior>,
    create_error: Mutex<Option<ClientError>>,
    created: Mutex<Vec<Arc<MockClient>>>,
}

impl MockFactory {
    /// Factory producing healthy default clients.
    pub fn new() -> Self {
        Self::with_behavior(MockBehavior::default())
    }

    /// Factory producing clients scripted with `behavior`.
    pub fn with_behavior(behavior: MockBehavior) -> Self {
        Self {
            template: Mutex::new(behavior),
            create_error: Mutex::new(None),
            created: Mutex::new(Vec::new()),
        }
    }

    /// Rewrite the template used for clients constructed from now on.
    pub fn configure(&self, f: impl FnOnce(&mut MockBehavior)) {
        f(&mut self.template.lock().unwrap());
    }

    /// Make the next `create` calls fail with `error`.
    pub fn fail_creation(&self, error: Option<ClientError>) {
        *self.create_error.lock().unwrap() = error;
    }

    /// Every client constructed so far, in creation order.
    pub fn created_clients(&self) -> Vec<Arc<MockClient>> {
        self.created.lock().unwrap().clone()
    }

    /// The most recently constructed client.
    pub fn last_client(&self) -> Option<Arc<MockClient>> {
        self.created.lock().unwrap().last().cloned()
    }
}

impl Default for MockFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClientFactory for MockFactory {
    async fn create(&self, config: ClientConfig) -> Result<Arc<dyn ProtocolClient>> {
        if let Some(error) = self.create_error.lock().unwrap().clone() {
            return Err(error);
        }

        let behavior = self.template.lock().unwrap().clone();
        let client = Arc::new(MockClient::new(config, behavior));
        self.created.lock().unwrap().push(Arc::clone(&client));
        Ok(client)
    }
}
