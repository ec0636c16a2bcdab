//! # Host Bridge Traits
//!
//! Capability traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the playback orchestration core and
//! the collaborators it never reimplements: the native playback engine (via its
//! media-session transport) and the persistent download/cache engine. Each
//! trait represents a capability that the core requires but that must be
//! implemented differently per platform (desktop, iOS, Android).
//!
//! ## Traits
//!
//! - [`PlaybackConnector`](playback::PlaybackConnector) - Establish a transport
//!   connection to the asynchronously-initializing playback engine
//! - [`TransportControls`](playback::TransportControls) - Device-level commands
//!   and the closed custom-command set forwarded to the engine
//! - [`DownloadEngine`](download::DownloadEngine) - Opaque download/cache
//!   subsystem: enqueue, remove, progress refresh, cache queries
//!
//! ## Shared value types
//!
//! The value objects exchanged across the bridge boundary live here so that
//! every core crate speaks the same vocabulary: [`MediaRequest`],
//! [`PlaybackPhase`], [`Chapter`], [`PlaybackMetadata`], [`StartOptions`],
//! [`PlayableSource`], [`TransportCommand`] and [`TransportEvent`].
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type.
//! Platform implementations should convert native errors to `BridgeError` and
//! provide actionable messages. `BridgeError::ChannelClosed` carries a special
//! meaning for the core: the transport connection is gone for good, and
//! callers treat it as a terminal rather than transient fault.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds to support safe concurrent
//! usage across async tasks. Implementations must ensure thread safety.

pub mod download;
pub mod error;
pub mod playback;

pub use error::BridgeError;

// Re-export commonly used types
pub use download::DownloadEngine;
pub use playback::{
    Chapter, ContentTag, MediaRequest, PlaybackConnection, PlaybackConnector, PlaybackMetadata,
    PlaybackPhase, PlayableSource, StartOptions, TransportCommand, TransportControls,
    TransportEvent,
};
