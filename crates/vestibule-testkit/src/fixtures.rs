//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: a session manager wired to
//! an in-memory identity store and a scriptable mock client factory.

use std::sync::Arc;
use std::time::Duration;

use vestibule::{SessionConfig, SessionManager, SessionStatus};
use vestibule_client::mock::{MockClient, MockFactory};
use vestibule_client::SyncPhase;
use vestibule_core::AccessToken;
use vestibule_store::{IdentityStore, MemoryIdentityStore};

/// A test fixture with a memory store, a mock factory, and a manager
/// wired over both. The store and factory stay reachable for scripting
/// and assertions after the manager takes ownership.
pub struct SessionFixture {
    pub store: Arc<MemoryIdentityStore>,
    pub factory: Arc<MockFactory>,
    pub manager: SessionManager<Arc<MemoryIdentityStore>, Arc<MockFactory>>,
}

impl SessionFixture {
    /// Create a fixture with a healthy default server script and a short
    /// request timeout suitable for tests.
    pub fn new() -> Self {
        let store = Arc::new(MemoryIdentityStore::new());
        let factory = Arc::new(MockFactory::new());
        let manager = SessionManager::new(
            Arc::clone(&store),
            Arc::clone(&factory),
            SessionConfig {
                request_timeout: Duration::from_millis(200),
                ..SessionConfig::default()
            },
        );
        Self {
            store,
            factory,
            manager,
        }
    }

    /// Create a fixture with a persisted access credential, as if a
    /// previous session had authenticated.
    pub async fn authenticated(token: &str) -> Self {
        let fixture = Self::new();
        fixture
            .store
            .save_access_token(Some(&AccessToken::new(token)))
            .await
            .expect("seed access token");
        fixture
    }

    /// The most recently constructed mock client.
    ///
    /// Panics if no client was constructed yet; call after bootstrap.
    pub fn last_client(&self) -> Arc<MockClient> {
        self.factory
            .last_client()
            .expect("no client constructed yet")
    }

    /// Emit the first-full-sync event and wait for the ready transition.
    pub async fn drive_to_ready(&self) {
        self.last_client().emit_sync(SyncPhase::Prepared);
        self.wait_for_status(SessionStatus::Ready).await;
    }

    /// Wait until the manager reports `want`, panicking after a second.
    pub async fn wait_for_status(&self, want: SessionStatus) {
        let mut rx = self.manager.subscribe_status();
        tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                if *rx.borrow() == want {
                    return;
                }
                rx.changed().await.expect("status channel closed");
            }
        })
        .await
        .unwrap_or_else(|_| panic!("status never reached {want}"));
    }
}

impl Default for SessionFixture {
    fn default() -> Self {
        Self::new()
    }
}
