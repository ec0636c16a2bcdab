//! # State Store
//!
//! The single source of truth for a playback session: one immutable snapshot,
//! replaced (never mutated) by applying a closed set of [`Action`]s through a
//! pure reducer, and published to subscribers in dispatch order.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  dispatch(Action)   ┌────────────────┐
//! │ Choreographer├────────────────────>│                │
//! └──────────────┘                     │   StateStore   │  subscribe()  ┌────────────┐
//! ┌──────────────┐  dispatch(Action)   │ reduce + swap  ├──────────────>│ Subscriber │
//! │ Reconciler   ├────────────────────>│ + broadcast    │               └────────────┘
//! └──────────────┘                     └────────────────┘
//! ```
//!
//! `dispatch` is fire-and-forget and synchronous: the reducer runs and the new
//! snapshot is broadcast before the call returns. `subscribe` has
//! replay-latest-then-live semantics - the most recent snapshot is yielded
//! first, followed by every subsequent one with no loss or reordering (a
//! subscriber that falls behind the channel capacity observes
//! [`RecvError::Lagged`](tokio::sync::broadcast::error::RecvError) instead of
//! silently skipping).
//!
//! Failures never propagate as return values out of the orchestration layer;
//! they are wrapped into [`Action::Error`] carrying a [`PlayerError`] and land
//! in the snapshot's `error` field, which is the only failure channel callers
//! observe.

pub mod action;
pub mod error;
pub mod state;
pub mod store;

pub use action::{reduce, Action};
pub use error::PlayerError;
pub use state::{DownloadInfo, DownloadProgress, InternalState, PlaybackInfo, PlayerState};
pub use store::{StateStore, StateSubscription, DEFAULT_STATE_BUFFER_SIZE};
