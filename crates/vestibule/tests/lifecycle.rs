//! End-to-end lifecycle tests: bootstrap, silent resume, rollback, and
//! logout against a scripted in-memory protocol client.

use std::sync::Arc;
use std::time::Duration;

use vestibule::client::mock::MockFactory;
use vestibule::client::{ClientError, ServerVersions, SyncPhase};
use vestibule::store::{IdentityStore, MemoryIdentityStore};
use vestibule::{
    AccessToken, SessionConfig, SessionError, SessionManager, SessionStatus, StatusReceiver,
};

type Manager = SessionManager<Arc<MemoryIdentityStore>, Arc<MockFactory>>;

struct Harness {
    store: Arc<MemoryIdentityStore>,
    factory: Arc<MockFactory>,
    manager: Manager,
}

fn harness() -> Harness {
    // Best-effort: later calls fail once a subscriber is installed.
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

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
    Harness {
        store,
        factory,
        manager,
    }
}

async fn wait_for(mut rx: StatusReceiver, want: SessionStatus) {
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

// ────────────────────────────────────────────────────────────────────────────
// Bootstrap without a credential
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn bootstrap_without_credential_ends_idle_with_client() {
    let h = harness();
    h.manager.select_homeserver("https://example.org").await.unwrap();

    h.manager.bootstrap().await.unwrap();

    assert_eq!(h.manager.status(), SessionStatus::Idle);
    assert!(h.manager.has_active_client());
    assert!(h.manager.current_user().is_none());
    // Selection survives: the caller drives manual login next.
    assert!(h.manager.selected_homeserver().await.unwrap().is_some());
}

// ────────────────────────────────────────────────────────────────────────────
// Rollback invariant
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn failed_validation_rolls_back_to_clean_state() {
    let h = harness();
    h.manager.select_homeserver("https://example.org").await.unwrap();
    h.factory
        .configure(|b| b.server_versions = Err(ClientError::Network("refused".into())));

    let err = h.manager.bootstrap().await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::InvalidHomeserver { ref name } if name == "example.org"
    ));

    assert_eq!(h.manager.status(), SessionStatus::Idle);
    assert!(h.manager.selected_homeserver().await.unwrap().is_none());
    assert!(!h.manager.has_active_client());
}

#[tokio::test]
async fn noncompliant_server_rolls_back() {
    let h = harness();
    h.manager.select_homeserver("https://example.org").await.unwrap();
    h.factory
        .configure(|b| b.server_versions = Ok(ServerVersions::default()));

    let err = h.manager.bootstrap().await.unwrap_err();
    assert!(matches!(err, SessionError::InvalidHomeserver { .. }));
    assert_eq!(h.manager.status(), SessionStatus::Idle);
    assert!(h.manager.selected_homeserver().await.unwrap().is_none());
}

#[tokio::test]
async fn construction_failure_rolls_back() {
    let h = harness();
    h.manager.select_homeserver("https://example.org").await.unwrap();
    h.factory
        .fail_creation(Some(ClientError::Setup("store locked".into())));

    let err = h.manager.bootstrap().await.unwrap_err();
    assert!(matches!(err, SessionError::ClientConstructionFailed(_)));

    assert_eq!(h.manager.status(), SessionStatus::Idle);
    assert!(h.manager.selected_homeserver().await.unwrap().is_none());
    assert!(!h.manager.has_active_client());

    // Rollback must be repeatable: a second failed attempt behaves the
    // same way after reselecting.
    h.manager.select_homeserver("https://example.org").await.unwrap();
    let err = h.manager.bootstrap().await.unwrap_err();
    assert!(matches!(err, SessionError::ClientConstructionFailed(_)));
    assert_eq!(h.manager.status(), SessionStatus::Idle);
}

// ────────────────────────────────────────────────────────────────────────────
// Silent resume
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn resume_reaches_ready_only_after_prepared_event() {
    let h = harness();
    h.store
        .save_access_token(Some(&AccessToken::new("syt_valid")))
        .await
        .unwrap();
    h.manager.select_homeserver("https://example.org").await.unwrap();

    h.manager.bootstrap().await.unwrap();

    // The sync loop is running but the first full sync has not landed:
    // no direct connecting -> ready shortcut.
    assert_eq!(h.manager.status(), SessionStatus::Syncing);
    assert_eq!(h.manager.current_user().unwrap().as_str(), "@alice:example.org");

    let client = h.factory.last_client().unwrap();
    client.emit_sync(SyncPhase::Catchup);
    assert_eq!(h.manager.status(), SessionStatus::Syncing);

    client.emit_sync(SyncPhase::Prepared);
    wait_for(h.manager.subscribe_status(), SessionStatus::Ready).await;
}

#[tokio::test]
async fn ready_observer_detaches_after_first_prepared() {
    let h = harness();
    h.store
        .save_access_token(Some(&AccessToken::new("syt_valid")))
        .await
        .unwrap();
    h.manager.select_homeserver("https://example.org").await.unwrap();
    h.manager.bootstrap().await.unwrap();

    let client = h.factory.last_client().unwrap();
    client.emit_sync(SyncPhase::Prepared);
    wait_for(h.manager.subscribe_status(), SessionStatus::Ready).await;

    // The one-shot observer unsubscribes once it has fired; replayed
    // prepared events find no session-core subscriber.
    tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            if client.emit_sync(SyncPhase::Prepared) == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("ready observer never detached");

    assert_eq!(h.manager.status(), SessionStatus::Ready);
}

#[tokio::test]
async fn expired_credential_returns_to_idle_and_clears_token() {
    let h = harness();
    h.store
        .save_access_token(Some(&AccessToken::new("syt_expired")))
        .await
        .unwrap();
    h.manager.select_homeserver("https://example.org").await.unwrap();
    h.factory
        .configure(|b| b.whoami = Err(ClientError::Unauthorized("unknown token".into())));

    // Silent resume swallows the failure.
    h.manager.bootstrap().await.unwrap();

    assert_eq!(h.manager.status(), SessionStatus::Idle);
    assert!(h.store.access_token().await.unwrap().is_none());
    // The constructed client and the selection stay for manual login.
    assert!(h.manager.has_active_client());
    assert!(h.manager.selected_homeserver().await.unwrap().is_some());
}

#[tokio::test]
async fn direct_resume_propagates_authentication_expired() {
    let h = harness();
    h.manager.select_homeserver("https://example.org").await.unwrap();
    h.manager.bootstrap().await.unwrap();

    h.factory.last_client().unwrap().configure(|b| {
        b.whoami = Err(ClientError::Unauthorized("unknown token".into()));
    });

    let err = h.manager.resume().await.unwrap_err();
    assert!(matches!(err, SessionError::AuthenticationExpired));
    assert_eq!(h.manager.status(), SessionStatus::Idle);
}

#[tokio::test]
async fn encryption_failure_degrades_instead_of_aborting() {
    let h = harness();
    h.store
        .save_access_token(Some(&AccessToken::new("syt_valid")))
        .await
        .unwrap();
    h.manager.select_homeserver("https://example.org").await.unwrap();
    h.factory.configure(|b| {
        b.init_encryption = Err(ClientError::Setup("olm store corrupt".into()));
        b.warm_cache = Err(ClientError::Setup("cache missing".into()));
    });

    h.manager.bootstrap().await.unwrap();
    assert_eq!(h.manager.status(), SessionStatus::Syncing);

    let client = h.factory.last_client().unwrap();
    assert_eq!(
        client.calls().start_sync.load(std::sync::atomic::Ordering::SeqCst),
        1
    );

    client.emit_sync(SyncPhase::Prepared);
    wait_for(h.manager.subscribe_status(), SessionStatus::Ready).await;
}

#[tokio::test]
async fn sync_start_failure_returns_resume_error_and_idles() {
    let h = harness();
    h.store
        .save_access_token(Some(&AccessToken::new("syt_valid")))
        .await
        .unwrap();
    h.manager.select_homeserver("https://example.org").await.unwrap();
    h.factory
        .configure(|b| b.start_sync = Err(ClientError::Network("sync refused".into())));

    // Swallowed by the silent-resume path.
    h.manager.bootstrap().await.unwrap();
    assert_eq!(h.manager.status(), SessionStatus::Idle);
    // Not an auth failure: the credential survives for a retry.
    assert!(h.store.access_token().await.unwrap().is_some());
}

// ────────────────────────────────────────────────────────────────────────────
// Concurrency guard
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn second_bootstrap_while_syncing_is_rejected() {
    let h = harness();
    h.store
        .save_access_token(Some(&AccessToken::new("syt_valid")))
        .await
        .unwrap();
    h.manager.select_homeserver("https://example.org").await.unwrap();
    h.manager.bootstrap().await.unwrap();
    assert_eq!(h.manager.status(), SessionStatus::Syncing);

    let err = h.manager.bootstrap().await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::BootstrapInProgress(SessionStatus::Syncing)
    ));
    // The rejected call must not have disturbed the running session.
    assert_eq!(h.manager.status(), SessionStatus::Syncing);
    assert!(h.manager.has_active_client());
}

#[tokio::test]
async fn bootstrap_after_ready_is_allowed() {
    let h = harness();
    h.store
        .save_access_token(Some(&AccessToken::new("syt_valid")))
        .await
        .unwrap();
    h.manager.select_homeserver("https://example.org").await.unwrap();
    h.manager.bootstrap().await.unwrap();
    h.factory.last_client().unwrap().emit_sync(SyncPhase::Prepared);
    wait_for(h.manager.subscribe_status(), SessionStatus::Ready).await;

    // A ready session may be re-bootstrapped (e.g. after a config change).
    h.manager.bootstrap().await.unwrap();
    assert_eq!(h.manager.status(), SessionStatus::Syncing);
}

// ────────────────────────────────────────────────────────────────────────────
// Logout
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn logout_clears_session_from_any_status() {
    let h = harness();
    h.store
        .save_access_token(Some(&AccessToken::new("syt_valid")))
        .await
        .unwrap();
    h.manager.select_homeserver("https://example.org").await.unwrap();
    h.manager.bootstrap().await.unwrap();

    h.manager.logout().await.unwrap();

    assert_eq!(h.manager.status(), SessionStatus::Idle);
    assert!(!h.manager.has_active_client());
    assert!(h.manager.current_user().is_none());
    assert!(h.store.access_token().await.unwrap().is_none());
    assert!(h.manager.selected_homeserver().await.unwrap().is_none());

    // Idempotent: logging out an already-clean session is a no-op.
    h.manager.logout().await.unwrap();
    assert_eq!(h.manager.status(), SessionStatus::Idle);
}

#[tokio::test]
async fn logout_stops_the_client() {
    let h = harness();
    h.store
        .save_access_token(Some(&AccessToken::new("syt_valid")))
        .await
        .unwrap();
    h.manager.select_homeserver("https://example.org").await.unwrap();
    h.manager.bootstrap().await.unwrap();
    let client = h.factory.last_client().unwrap();

    h.manager.logout().await.unwrap();
    assert_eq!(client.calls().stop.load(std::sync::atomic::Ordering::SeqCst), 1);
}

// ────────────────────────────────────────────────────────────────────────────
// Registry scenario
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn selecting_new_url_extends_known_set() {
    let h = harness();

    let known = h.manager.known_homeservers().await.unwrap();
    assert_eq!(known.len(), 1);
    assert_eq!(known[0].url, "https://matrix.org");

    let selected = h.manager.select_homeserver("https://example.org").await.unwrap();
    assert_eq!(selected.name, "example.org");
    assert_eq!(selected.url, "https://example.org");

    let known = h.manager.known_homeservers().await.unwrap();
    assert_eq!(known.len(), 2);
    assert_eq!(known[1].url, "https://example.org");
}

// ────────────────────────────────────────────────────────────────────────────
// Login flows & verification
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn login_flows_are_cached_after_discovery() {
    let h = harness();
    h.manager.select_homeserver("https://example.org").await.unwrap();
    h.manager.bootstrap().await.unwrap();

    let flows = h.manager.discover_login_flows().await.unwrap();
    assert_eq!(flows.len(), 2);
    assert!(flows[0].is_password());
    assert_eq!(h.manager.cached_login_flows(), flows);
}

#[tokio::test]
async fn flow_discovery_failure_leaves_cache_untouched() {
    let h = harness();
    h.manager.select_homeserver("https://example.org").await.unwrap();
    h.manager.bootstrap().await.unwrap();
    h.manager.discover_login_flows().await.unwrap();

    h.factory.last_client().unwrap().configure(|b| {
        b.login_flows = Err(ClientError::Network("flaky".into()));
    });

    assert!(h.manager.discover_login_flows().await.is_err());
    assert_eq!(h.manager.cached_login_flows().len(), 2);
}

#[tokio::test]
async fn device_verification_reflects_client_state() {
    let h = harness();
    assert!(!h.manager.is_device_verified().await);

    h.manager.select_homeserver("https://example.org").await.unwrap();
    h.manager.bootstrap().await.unwrap();
    assert!(!h.manager.is_device_verified().await);

    h.factory.last_client().unwrap().configure(|b| {
        b.device_verification = Ok(Some(vestibule::client::DeviceVerification::Verified));
    });
    assert!(h.manager.is_device_verified().await);
}
