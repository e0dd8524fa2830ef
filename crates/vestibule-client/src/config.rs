//! Client construction configuration.

use vestibule_core::{AccessToken, DeviceId};

/// Namespace identifier for the client's local sync cache.
///
/// Fixed: the cache must be found again across restarts.
pub const SYNC_STORE_NAMESPACE: &str = "vestibule-sync";

/// Namespace identifier for the client's crypto key store.
pub const CRYPTO_STORE_NAMESPACE: &str = "vestibule-crypto";

/// An interactive device-verification method the client should offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationMethod {
    /// Short-authentication-string (emoji) comparison.
    Sas,
    /// Display a QR code for the peer to scan.
    QrCodeShow,
    /// Scan a QR code displayed by the peer.
    QrCodeScan,
}

/// Configuration handed to a [`crate::ClientFactory`].
///
/// A throwaway validation client carries no device id or token; a session
/// client is bound to the persisted identity.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the homeserver to bind to.
    pub homeserver_url: String,
    /// Persisted device identifier, absent for throwaway clients.
    pub device_id: Option<DeviceId>,
    /// Persisted access credential, absent until authentication succeeds.
    pub access_token: Option<AccessToken>,
    /// Whether room timeline support should be wired up.
    pub timeline_support: bool,
    /// Verification methods the client should advertise.
    pub verification_methods: Vec<VerificationMethod>,
    /// Namespace for the local sync cache.
    pub sync_store_namespace: &'static str,
    /// Namespace for the crypto key store.
    pub crypto_store_namespace: &'static str,
}

impl ClientConfig {
    /// Configuration for a full session client bound to a device identity.
    pub fn new(homeserver_url: impl Into<String>, device_id: DeviceId) -> Self {
        Self {
            homeserver_url: homeserver_url.into(),
            device_id: Some(device_id),
            access_token: None,
            timeline_support: true,
            verification_methods: vec![VerificationMethod::Sas],
            sync_store_namespace: SYNC_STORE_NAMESPACE,
            crypto_store_namespace: CRYPTO_STORE_NAMESPACE,
        }
    }

    /// Configuration for a throwaway, unauthenticated validation client.
    ///
    /// No identity, no timeline, no verification; only metadata queries.
    pub fn unauthenticated(homeserver_url: impl Into<String>) -> Self {
        Self {
            homeserver_url: homeserver_url.into(),
            device_id: None,
            access_token: None,
            timeline_support: false,
            verification_methods: Vec::new(),
            sync_store_namespace: SYNC_STORE_NAMESPACE,
            crypto_store_namespace: CRYPTO_STORE_NAMESPACE,
        }
    }

    /// Attach an access credential.
    pub fn with_access_token(mut self, token: Option<AccessToken>) -> Self {
        self.access_token = token;
        self
    }

    /// Override the advertised verification methods.
    pub fn with_verification_methods(mut self, methods: Vec<VerificationMethod>) -> Self {
        self.verification_methods = methods;
        self
    }

    /// Whether this configuration carries a credential.
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }
}
