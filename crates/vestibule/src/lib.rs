//! # Vestibule
//!
//! Client-side session lifecycle for a federated chat homeserver:
//! discovering and validating candidate servers, bootstrapping an
//! authenticated client session, tracking progress through an explicit
//! state machine, and persisting enough identity to resume without
//! re-authentication.
//!
//! ## Overview
//!
//! The [`SessionManager`] coordinates three collaborators:
//!
//! - an [`IdentityStore`](vestibule_store::IdentityStore) for the durable
//!   identity records (known homeservers, selection, credential, device id)
//! - a [`ClientFactory`](vestibule_client::ClientFactory) constructing
//!   protocol clients, both throwaway validation probes and the session
//!   client
//! - a [`StatusHandle`](vestibule_core::StatusHandle) exposing the
//!   lifecycle phase (`idle -> connecting -> syncing -> ready`) to
//!   observers
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vestibule::{SessionConfig, SessionManager};
//! use vestibule::client::mock::MockFactory;
//! use vestibule::store::SqliteIdentityStore;
//!
//! async fn example() -> vestibule::Result<()> {
//!     let store = SqliteIdentityStore::open("identity.db")?;
//!     let factory = MockFactory::new(); // a real SDK factory in production
//!     let manager = SessionManager::new(store, factory, SessionConfig::default());
//!
//!     manager.select_homeserver("https://matrix.org").await?;
//!     manager.bootstrap().await?;
//!
//!     // Ready arrives asynchronously once the first full sync lands.
//!     let mut status = manager.subscribe_status();
//!     status.changed().await.ok();
//!     Ok(())
//! }
//! ```
//!
//! ## Failure model
//!
//! Validation and construction failures roll the session back to a clean
//! unauthenticated state and surface as [`SessionError`]; encryption-init
//! and cache-warm-up failures degrade gracefully and are only logged. A
//! failed silent resume returns the session to idle so manual login can
//! proceed.

pub mod error;
pub mod session;
pub mod validator;

// Re-export component crates
pub use vestibule_client as client;
pub use vestibule_core as core;
pub use vestibule_store as store;

// Re-export main types for convenience
pub use error::{Result, SessionError};
pub use session::{SessionConfig, SessionManager};
pub use validator::HomeserverValidator;

// Re-export commonly used core types
pub use vestibule_core::{
    AccessToken, DeviceId, Homeserver, LoginFlow, SessionStatus, StatusHandle, StatusReceiver,
    UserId,
};
