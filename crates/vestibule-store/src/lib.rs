//! # Vestibule Store
//!
//! Durable persistence of session identity: known homeservers, the
//! selected homeserver, the access credential, and the device identifier.
//!
//! The [`IdentityStore`] trait keeps the session core storage-agnostic.
//! Implementations include SQLite (primary) and in-memory (for tests).
//! The four records are independent; none references another, and each
//! may be absent.

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryIdentityStore;
pub use sqlite::SqliteIdentityStore;
pub use traits::{
    decode_homeserver_record, default_known_homeservers, records, IdentityStore, IdentityStoreExt,
};
