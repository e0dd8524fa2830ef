//! SQLite implementation of the IdentityStore trait.
//!
//! This is the primary storage backend. It uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use vestibule_core::{AccessToken, DeviceId, Homeserver};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{
    decode_homeserver_record, default_known_homeservers, records, IdentityStore,
};

/// SQLite-based identity store.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteIdentityStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteIdentityStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking closure against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| StoreError::Task("connection mutex poisoned".into()))?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }

    async fn get_record(&self, key: &'static str) -> Result<Option<String>> {
        self.with_conn(move |conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM identity_records WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value)
        })
        .await
    }

    async fn put_record(&self, key: &'static str, value: String) -> Result<()> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO identity_records (key, value, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
                params![key, value, now_millis()],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete_record(&self, key: &'static str) -> Result<()> {
        self.with_conn(move |conn| {
            conn.execute(
                "DELETE FROM identity_records WHERE key = ?1",
                params![key],
            )?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl IdentityStore for SqliteIdentityStore {
    async fn known_homeservers(&self) -> Result<Vec<Homeserver>> {
        match self.get_record(records::KNOWN_HOMESERVERS).await? {
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
        self.put_record(records::KNOWN_HOMESERVERS, raw).await
    }

    async fn selected_homeserver(&self) -> Result<Option<Homeserver>> {
        Ok(self
            .get_record(records::SELECTED_HOMESERVER)
            .await?
            .map(|raw| decode_homeserver_record(&raw)))
    }

    async fn save_selected_homeserver(&self, homeserver: Option<&Homeserver>) -> Result<()> {
        match homeserver {
            Some(hs) => {
                let raw = serde_json::to_string(hs)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                self.put_record(records::SELECTED_HOMESERVER, raw).await
            }
            None => self.delete_record(records::SELECTED_HOMESERVER).await,
        }
    }

    async fn access_token(&self) -> Result<Option<AccessToken>> {
        Ok(self
            .get_record(records::ACCESS_TOKEN)
            .await?
            .map(AccessToken::new))
    }

    async fn save_access_token(&self, token: Option<&AccessToken>) -> Result<()> {
        match token {
            Some(t) => {
                self.put_record(records::ACCESS_TOKEN, t.expose().to_string())
                    .await
            }
            None => self.delete_record(records::ACCESS_TOKEN).await,
        }
    }

    async fn device_id(&self) -> Result<Option<DeviceId>> {
        Ok(self
            .get_record(records::DEVICE_ID)
            .await?
            .map(DeviceId::new))
    }

    async fn save_device_id(&self, device_id: &DeviceId) -> Result<()> {
        self.put_record(records::DEVICE_ID, device_id.as_str().to_string())
            .await
    }
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as i64
}
