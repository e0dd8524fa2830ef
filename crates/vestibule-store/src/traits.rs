//! IdentityStore trait: the abstract interface for session identity
//! persistence.
//!
//! Four independent records back the connection lifecycle:
//!
//! - **known homeservers**: ordered list, deduplicated by URL,
//!   default-seeded with one well-known public entry.
//! - **selected homeserver**: at most one entry; serialized as JSON with a
//!   raw-string fallback so corrupt data never fails a load.
//! - **access credential**: opaque string, absent until authentication
//!   succeeds, cleared on logout or credential rejection.
//! - **device identifier**: generated once and stable for the lifetime of
//!   local storage.

use async_trait::async_trait;
use vestibule_core::{AccessToken, DeviceId, Homeserver};

use crate::error::Result;

/// Record keys shared by all backends.
pub mod records {
    /// Ordered list of known homeservers, as a JSON array.
    pub const KNOWN_HOMESERVERS: &str = "known_homeservers";
    /// The selected homeserver, as JSON (raw URL accepted on read).
    pub const SELECTED_HOMESERVER: &str = "selected_homeserver";
    /// The opaque access credential.
    pub const ACCESS_TOKEN: &str = "access_token";
    /// The stable device identifier.
    pub const DEVICE_ID: &str = "device_id";
}

/// The default known-homeserver seed, used whenever the record is absent.
pub fn default_known_homeservers() -> Vec<Homeserver> {
    vec![Homeserver {
        name: "matrix.org".to_string(),
        url: "https://matrix.org".to_string(),
        description: Some("The largest public homeserver".to_string()),
        featured: true,
        favorite: false,
    }]
}

/// Decode a persisted homeserver record.
///
/// Accepts the JSON form written by [`IdentityStore::save_selected_homeserver`]
/// and, as a fallback, a bare URL string left behind by older installs or
/// corrupted writes. Never fails.
pub fn decode_homeserver_record(raw: &str) -> Homeserver {
    serde_json::from_str(raw).unwrap_or_else(|_| Homeserver::from_url(raw.trim()))
}

/// The IdentityStore trait: async interface for identity persistence.
///
/// All methods are async to support both blocking (SQLite) and async
/// backends; the SQLite implementation uses `spawn_blocking` internally
/// to avoid stalling the runtime.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Load the known homeservers, seeded with
    /// [`default_known_homeservers`] when the record is absent.
    async fn known_homeservers(&self) -> Result<Vec<Homeserver>>;

    /// Replace the known-homeserver list.
    async fn save_known_homeservers(&self, homeservers: &[Homeserver]) -> Result<()>;

    /// Load the selected homeserver, if any.
    async fn selected_homeserver(&self) -> Result<Option<Homeserver>>;

    /// Persist the selected homeserver; `None` clears the record.
    async fn save_selected_homeserver(&self, homeserver: Option<&Homeserver>) -> Result<()>;

    /// Load the access credential, if any.
    async fn access_token(&self) -> Result<Option<AccessToken>>;

    /// Persist the access credential; `None` clears the record.
    async fn save_access_token(&self, token: Option<&AccessToken>) -> Result<()>;

    /// Load the device identifier, if one was ever generated.
    async fn device_id(&self) -> Result<Option<DeviceId>>;

    /// Persist the device identifier.
    async fn save_device_id(&self, device_id: &DeviceId) -> Result<()>;
}

#[async_trait]
impl<S: IdentityStore + ?Sized> IdentityStore for std::sync::Arc<S> {
    async fn known_homeservers(&self) -> Result<Vec<Homeserver>> {
        (**self).known_homeservers().await
    }

    async fn save_known_homeservers(&self, homeservers: &[Homeserver]) -> Result<()> {
        (**self).save_known_homeservers(homeservers).await
    }

    async fn selected_homeserver(&self) -> Result<Option<Homeserver>> {
        (**self).selected_homeserver().await
    }

    async fn save_selected_homeserver(&self, homeserver: Option<&Homeserver>) -> Result<()> {
        (**self).save_selected_homeserver(homeserver).await
    }

    async fn access_token(&self) -> Result<Option<AccessToken>> {
        (**self).access_token().await
    }

    async fn save_access_token(&self, token: Option<&AccessToken>) -> Result<()> {
        (**self).save_access_token(token).await
    }

    async fn device_id(&self) -> Result<Option<DeviceId>> {
        (**self).device_id().await
    }

    async fn save_device_id(&self, device_id: &DeviceId) -> Result<()> {
        (**self).save_device_id(device_id).await
    }
}

/// Extension trait for common identity-store patterns.
pub trait IdentityStoreExt: IdentityStore {
    /// Load the device identifier, generating and persisting a fresh one
    /// if the record is absent. The returned value is stable across calls.
    fn device_id_or_generate(&self) -> impl std::future::Future<Output = Result<DeviceId>> + Send;
}

impl<S: IdentityStore + ?Sized> IdentityStoreExt for S {
    async fn device_id_or_generate(&self) -> Result<DeviceId> {
        if let Some(existing) = self.device_id().await? {
            return Ok(existing);
        }

        let generated = DeviceId::generate();
        self.save_device_id(&generated).await?;
        Ok(generated)
    }
}
