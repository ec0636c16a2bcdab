//! # Playback Orchestration Module
//!
//! Keeps the state store synchronized with the asynchronously-initializing
//! playback engine and serializes client commands against it.
//!
//! ## Overview
//!
//! This module handles:
//! - The public command surface ([`Choreographer`]) with its three readiness
//!   classes: immediate-or-error, deferred, and lifecycle
//! - The readiness gate deciding whether a command runs now, waits, or errors
//! - The cancellable periodic reconciliation loop pulling engine progress
//!   into the store
//! - Session-scoped cancellation (the disposables registry) and the
//!   replaceable transport handle

pub mod choreographer;
pub mod config;
pub mod logging;
pub mod readiness;
pub mod reconcile;
pub mod transport;

pub use choreographer::{Choreographer, SessionId};
pub use config::{ChoreographerConfig, DeferredCommandPolicy, ReconcilerConfig};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use readiness::{ReadinessGate, ReadinessSnapshot};
pub use reconcile::ProgressReconciler;
pub use transport::TransportSlot;
