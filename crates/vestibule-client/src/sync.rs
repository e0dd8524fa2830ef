//! Synchronization event stream types.
//!
//! The session core never drives the sync loop itself; it subscribes to
//! the client's phase broadcasts and reacts. [`SyncPhase::Prepared`] is
//! the first-full-sync confirmation that moves a session to ready.

use tokio::sync::broadcast;

/// Phase reported by the client's synchronization loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Replaying local cache / catching up after a gap.
    Catchup,
    /// The first full synchronization has completed.
    Prepared,
    /// Steady-state incremental synchronization.
    Syncing,
    /// The loop hit an error and is backing off.
    Error,
    /// The loop was stopped.
    Stopped,
}

/// Subscription to a client's sync-phase broadcasts.
///
/// The underlying stream may replay or repeat phases; consumers that must
/// act only once (the ready observer) detach after the first match.
pub type SyncEvents = broadcast::Receiver<SyncPhase>;
