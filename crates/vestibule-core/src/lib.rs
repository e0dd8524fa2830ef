//! # Vestibule Core
//!
//! Pure primitives for the Vestibule session core: homeservers, identity
//! newtypes, and the session lifecycle state machine.
//!
//! This crate contains no I/O, no storage, no networking. It defines the
//! vocabulary shared by the identity store, the protocol-client seam, and
//! the session manager.
//!
//! ## Key Types
//!
//! - [`Homeserver`] - A server a client can connect to, identified by URL
//! - [`DeviceId`] - Stable per-installation identifier
//! - [`AccessToken`] - Opaque credential authorizing a session
//! - [`SessionStatus`] / [`StatusHandle`] - The observable lifecycle phase

pub mod status;
pub mod types;

pub use status::{SessionStatus, StatusHandle, StatusReceiver};
pub use types::{AccessToken, DeviceId, Homeserver, LoginFlow, UserId};
