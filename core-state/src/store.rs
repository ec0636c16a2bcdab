//! The state store: synchronous dispatch, ordered broadcast.
//!
//! Built on `tokio::sync::broadcast`, with one addition: subscription capture
//! happens under the same lock as dispatch, which is what turns "live-only"
//! broadcast semantics into replay-latest-then-live with no gap between the
//! replayed snapshot and the live sequence.

use crate::action::{reduce, Action};
use crate::state::PlayerState;
use parking_lot::Mutex;
use std::fmt;
use tokio::sync::broadcast;
use tracing::{trace, warn};

// Re-export so subscribers can match on lag/closure without naming tokio.
pub use tokio::sync::broadcast::error::RecvError;

/// Default broadcast capacity. Snapshots arrive at reconciliation cadence
/// (~2/s), so this absorbs several seconds of subscriber stall.
pub const DEFAULT_STATE_BUFFER_SIZE: usize = 64;

/// Single source of truth for one playback session.
pub struct StateStore {
    snapshot: Mutex<PlayerState>,
    sender: broadcast::Sender<PlayerState>,
}

impl StateStore {
    /// Create a store holding the default snapshot, with the given broadcast
    /// capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            snapshot: Mutex::new(PlayerState::default()),
            sender,
        }
    }

    /// Apply `action` through the reducer and publish the new snapshot.
    ///
    /// Fire-and-forget: the reducer and the publish both complete before the
    /// call returns, and publish order equals dispatch order. Dispatching
    /// with no subscribers is not an error.
    pub fn dispatch(&self, action: Action) {
        let mut snapshot = self.snapshot.lock();
        if let Action::Error(error) = &action {
            warn!(%error, "dispatching error action");
        } else {
            trace!(?action, "dispatching action");
        }
        let next = reduce(&snapshot, &action);
        *snapshot = next.clone();
        // Still under the lock: guarantees subscribers see dispatch order.
        let _ = self.sender.send(next);
    }

    /// The latest snapshot.
    pub fn current(&self) -> PlayerState {
        self.snapshot.lock().clone()
    }

    /// Subscribe with replay-latest-then-live semantics.
    ///
    /// The returned subscription yields the snapshot current at subscription
    /// time first, then every snapshot dispatched afterwards, in order.
    pub fn subscribe(&self) -> StateSubscription {
        let snapshot = self.snapshot.lock();
        StateSubscription {
            replay: Some(snapshot.clone()),
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(DEFAULT_STATE_BUFFER_SIZE)
    }
}

impl fmt::Debug for StateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStore")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// One subscriber's view of the snapshot sequence.
pub struct StateSubscription {
    replay: Option<PlayerState>,
    receiver: broadcast::Receiver<PlayerState>,
}

impl StateSubscription {
    /// Receive the next snapshot: the replayed latest first, then live ones.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n`
    /// snapshots, `RecvError::Closed` once the store is gone.
    pub async fn recv(&mut self) -> Result<PlayerState, RecvError> {
        if let Some(snapshot) = self.replay.take() {
            return Ok(snapshot);
        }
        self.receiver.recv().await
    }

    /// Non-blocking variant of [`recv`](Self::recv); `None` when no snapshot
    /// is pending.
    pub fn try_recv(&mut self) -> Option<Result<PlayerState, RecvError>> {
        if let Some(snapshot) = self.replay.take() {
            return Some(Ok(snapshot));
        }
        match self.receiver.try_recv() {
            Ok(snapshot) => Some(Ok(snapshot)),
            Err(broadcast::error::TryRecvError::Empty) => None,
            Err(broadcast::error::TryRecvError::Lagged(n)) => Some(Err(RecvError::Lagged(n))),
            Err(broadcast::error::TryRecvError::Closed) => Some(Err(RecvError::Closed)),
        }
    }
}

impl fmt::Debug for StateSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateSubscription")
            .field("has_replay", &self.replay.is_some())
            .finish()
    }
}
