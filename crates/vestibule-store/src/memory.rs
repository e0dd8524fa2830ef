//! In-memory implementation of the IdentityStore trait.
//!
//! This is primarily for testing. Records are stored in their serialized
//! form so the decode paths (JSON with raw-string fallback) are exercised
//! exactly as they are against SQLite.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use vestibule_core::{AccessToken, DeviceId, Homeserver};

use crate::error::{Result, StoreError};
use crate::traits::{
    decode_homeserver_record, default_known_homeservers, records, IdentityStore,
};

/// In-memory identity store.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryIdentityStore {
    records: RwLock<HashMap<&'static str, String>>,
}

impl MemoryIdentityStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a raw record value, bypassing serialization.
    ///
    /// Test hook for simulating corrupt or legacy on-disk data.
    pub fn insert_raw_record(&self, key: &'static str, value: impl Into<String>) {
        self.records.write().unwrap().insert(key, value.into());
    }

    fn get(&self, key: &str) -> Option<String> {
        self.records.read().unwrap().get(key).cloned()
    }

    fn put(&self, key: &'static str, value: String) {
        self.records.write().unwrap().insert(key, value);
    }

    fn remove(&self, key: &str) {
        self.records.write().unwrap().remove(key);
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn known_homeservers(&self) -> Result<Vec<Homeserver>> {
        match self.get(records::KNOWN_HOMESERVERS) {
            Some(raw) => Ok(serde_json::from_str(&raw).unwrap_or_else(|_| {
                tracing::warn!("known-homeserver record corrupt; reseeding defaults");
                default_known_homeservers()
            })),
            None => Ok(default_known_homeservers()),
        }
    }

    async fn save_known_homeservers(&self, homeservers: &[Homeserver]) -> Result<()> {
        let raw = serde_json::to_string(homeservers)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.put(records::KNOWN_HOMESERVERS, raw);
        Ok(())
    }

    async fn selected_homeserver(&self) -> Result<Option<Homeserver>> {
        Ok(self
            .get(records::SELECTED_HOMESERVER)
            .map(|raw| decode_homeserver_record(&raw)))
    }

    async fn save_selected_homeserver(&self, homeserver: Option<&Homeserver>) -> Result<()> {
        match homeserver {
            Some(hs) => {
                let raw = serde_json::to_string(hs)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                self.put(records::SELECTED_HOMESERVER, raw);
            }
            None => self.remove(records::SELECTED_HOMESERVER),
        }
        Ok(())
    }

    async fn access_token(&self) -> Result<Option<AccessToken>> {
        Ok(self.get(records::ACCESS_TOKEN).map(AccessToken::new))
    }

    async fn save_access_token(&self, token: Option<&AccessToken>) -> Result<()> {
        match token {
            Some(t) => self.put(records::ACCESS_TOKEN, t.expose().to_string()),
            None => self.remove(records::ACCESS_TOKEN),
        }
        Ok(())
    }

    async fn device_id(&self) -> Result<Option<DeviceId>> {
        Ok(self.get(records::DEVICE_ID).map(DeviceId::new))
    }

    async fn save_device_id(&self, device_id: &DeviceId) -> Result<()> {
        self.put(records::DEVICE_ID, device_id.as_str().to_string());
        Ok(())
    }
}
