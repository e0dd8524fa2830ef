//! Session lifecycle state machine.
//!
//! A single [`StatusHandle`] is the only mutation point for the lifecycle
//! phase; every other component observes it through [`StatusReceiver`]
//! subscriptions. The busy phases double as the mutual-exclusion signal
//! for bootstrap/resume/logout.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

/// Lifecycle phase of the session.
///
/// Transitions flow `Idle -> Connecting -> Syncing -> Ready`, with any
/// phase able to fall back to `Idle` on rollback or logout. `Ready` is
/// only entered after the first full-synchronization confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    /// No session activity; manual login or bootstrap may proceed.
    #[default]
    Idle,
    /// A client is being constructed and validated.
    Connecting,
    /// Credentials accepted; the synchronization loop is starting.
    Syncing,
    /// First full synchronization has completed.
    Ready,
}

impl SessionStatus {
    /// Whether a bootstrap is in flight. A new bootstrap request while
    /// busy must be rejected rather than raced.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Connecting | Self::Syncing)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Syncing => "syncing",
            Self::Ready => "ready",
        };
        f.write_str(s)
    }
}

/// Shared, observable session status.
///
/// Cheap to clone; all clones point at the same underlying channel. Only
/// the session manager should call [`StatusHandle::transition`].
#[derive(Clone)]
pub struct StatusHandle {
    tx: Arc<watch::Sender<SessionStatus>>,
}

/// Subscription to status transitions.
pub type StatusReceiver = watch::Receiver<SessionStatus>;

impl StatusHandle {
    /// Create a handle starting at [`SessionStatus::Idle`].
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionStatus::Idle);
        Self { tx: Arc::new(tx) }
    }

    /// The current phase.
    pub fn current(&self) -> SessionStatus {
        *self.tx.borrow()
    }

    /// Move to a new phase. A no-op transition is not re-broadcast.
    pub fn transition(&self, to: SessionStatus) {
        let from = self.current();
        if from == to {
            return;
        }
        tracing::debug!(%from, %to, "session status transition");
        self.tx.send_replace(to);
    }

    /// Atomically enter [`SessionStatus::Connecting`], rejecting the
    /// request if a bootstrap is already in flight.
    ///
    /// This is the critical-section gate: check and transition happen
    /// under the channel lock, so two racing bootstrap calls cannot both
    /// pass.
    pub fn begin_connecting(&self) -> std::result::Result<(), SessionStatus> {
        let mut denied = None;
        self.tx.send_if_modified(|status| {
            if status.is_busy() {
                denied = Some(*status);
                false
            } else {
                *status = SessionStatus::Connecting;
                true
            }
        });
        match denied {
            Some(busy) => Err(busy),
            None => {
                tracing::debug!(to = %SessionStatus::Connecting, "session status transition");
                Ok(())
            }
        }
    }

    /// Subscribe to transitions. The receiver observes the current value
    /// immediately and every change thereafter.
    pub fn subscribe(&self) -> StatusReceiver {
        self.tx.subscribe()
    }
}

impl Default for StatusHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StatusHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StatusHandle").field(&self.current()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle() {
        let status = StatusHandle::new();
        assert_eq!(status.current(), SessionStatus::Idle);
        assert!(!status.current().is_busy());
    }

    #[test]
    fn busy_phases() {
        assert!(SessionStatus::Connecting.is_busy());
        assert!(SessionStatus::Syncing.is_busy());
        assert!(!SessionStatus::Idle.is_busy());
        assert!(!SessionStatus::Ready.is_busy());
    }

    #[test]
    fn clones_share_state() {
        let status = StatusHandle::new();
        let other = status.clone();
        status.transition(SessionStatus::Connecting);
        assert_eq!(other.current(), SessionStatus::Connecting);
    }

    #[tokio::test]
    async fn subscribers_observe_transitions() {
        let status = StatusHandle::new();
        let mut rx = status.subscribe();
        assert_eq!(*rx.borrow(), SessionStatus::Idle);

        status.transition(SessionStatus::Connecting);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), SessionStatus::Connecting);

        status.transition(SessionStatus::Syncing);
        status.transition(SessionStatus::Ready);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), SessionStatus::Ready);
    }

    #[test]
    fn begin_connecting_from_idle_and_ready() {
        let status = StatusHandle::new();
        assert!(status.begin_connecting().is_ok());
        assert_eq!(status.current(), SessionStatus::Connecting);

        status.transition(SessionStatus::Ready);
        assert!(status.begin_connecting().is_ok());
    }

    #[test]
    fn begin_connecting_rejected_while_busy() {
        let status = StatusHandle::new();
        status.transition(SessionStatus::Syncing);
        assert_eq!(status.begin_connecting(), Err(SessionStatus::Syncing));
        // Denied call must not have clobbered the phase.
        assert_eq!(status.current(), SessionStatus::Syncing);
    }

    #[tokio::test]
    async fn noop_transition_is_not_rebroadcast() {
        let status = StatusHandle::new();
        let mut rx = status.subscribe();
        rx.mark_unchanged();

        status.transition(SessionStatus::Idle);
        assert!(!rx.has_changed().unwrap());
    }
}
