//! Protocol client traits: the seam between the session core and the
//! underlying chat-protocol SDK.
//!
//! Implementations own the transport, the sync loop, and the crypto
//! subsystem. The session core only configures, queries, and supervises.

use std::sync::Arc;

use async_trait::async_trait;
use vestibule_core::{DeviceId, LoginFlow, UserId};

use crate::config::ClientConfig;
use crate::error::Result;
use crate::sync::SyncEvents;
use crate::versions::ServerVersions;

/// The account a credential resolves to, per the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    /// The authenticated user.
    pub user_id: UserId,
    /// The device the credential is bound to, when the server reports it.
    pub device_id: Option<DeviceId>,
}

/// Cross-signing verification state of the current device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceVerification {
    /// The device's keys are attested by the user's identity.
    Verified,
    /// The device has not been cross-signed.
    Unverified,
}

impl DeviceVerification {
    /// Whether the device is cross-signing-verified.
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified)
    }
}

/// A live protocol client bound to one homeserver.
///
/// All network operations are async and individually cancellable by the
/// caller's timeout; none of them block on the sync loop.
#[async_trait]
pub trait ProtocolClient: Send + Sync {
    /// Query the server's version and capability metadata.
    async fn server_versions(&self) -> Result<ServerVersions>;

    /// Resolve the attached credential to an account.
    async fn whoami(&self) -> Result<AccountInfo>;

    /// Query the authentication methods the server supports.
    async fn login_flows(&self) -> Result<Vec<LoginFlow>>;

    /// Initialize end-to-end encryption support.
    ///
    /// Failure leaves the session usable in reduced capacity; callers log
    /// and continue.
    async fn init_encryption(&self) -> Result<()>;

    /// Cross-signing verification state of this device.
    ///
    /// `None` when the crypto subsystem is not initialized or the lookup
    /// is unavailable.
    async fn device_verification(&self) -> Result<Option<DeviceVerification>>;

    /// Subscribe to sync-phase broadcasts.
    fn sync_events(&self) -> SyncEvents;

    /// Warm the local persistent cache before live synchronization, so
    /// replay can run from warm cache rather than cold network state.
    async fn warm_cache(&self) -> Result<()>;

    /// Start the long-lived synchronization loop.
    ///
    /// Returns once the loop is running; readiness arrives later through
    /// [`ProtocolClient::sync_events`].
    async fn start_sync(&self) -> Result<()>;

    /// Stop the sync loop and release the client's resources. Idempotent.
    async fn stop(&self);
}

/// Constructs protocol clients from configuration.
///
/// One factory serves both throwaway validation clients and the session
/// client; the configuration decides which kind is built.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// Build a client bound to the configured homeserver and identity.
    async fn create(&self, config: ClientConfig) -> Result<Arc<dyn ProtocolClient>>;
}

#[async_trait]
impl<F: ClientFactory + ?Sized> ClientFactory for Arc<F> {
    async fn create(&self, config: ClientConfig) -> Result<Arc<dyn ProtocolClient>> {
        (**self).create(config).await
    }
}
