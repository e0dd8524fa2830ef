//! # Vestibule Client
//!
//! The protocol-client seam: the interface the session core consumes from
//! the underlying chat-protocol SDK.
//!
//! This crate owns no wire format. It defines how a client is configured
//! and constructed ([`ClientConfig`], [`ClientFactory`]), what the session
//! core asks of a live client ([`ProtocolClient`]), and the shapes of the
//! answers (server versions, account info, verification state, sync
//! phases). The [`mock`] module provides a scriptable in-memory
//! implementation for tests.

pub mod config;
pub mod error;
pub mod mock;
pub mod sync;
pub mod traits;
pub mod versions;

pub use config::{ClientConfig, VerificationMethod, CRYPTO_STORE_NAMESPACE, SYNC_STORE_NAMESPACE};
pub use error::{ClientError, Result};
pub use sync::{SyncEvents, SyncPhase};
pub use traits::{AccountInfo, ClientFactory, DeviceVerification, ProtocolClient};
pub use versions::{ServerVersions, SUPPORTED_VERSIONS};
