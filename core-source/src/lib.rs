//! # Media Source Resolver
//!
//! Turns a [`MediaRequest`](bridge_traits::playback::MediaRequest) into a
//! [`PlayableSource`](bridge_traits::playback::PlayableSource) handle for the
//! playback engine, by classifying the request's locator and dispatching to
//! one of a closed set of source-generation strategies.
//!
//! ## Classification
//!
//! [`infer_content_tag`] is a pure function of the locator (and an optional
//! explicit extension override): `.m3u8` selects the segmented HLS strategy,
//! everything unrecognized selects the progressive strategy. DASH and Smooth
//! Streaming are recognized but unmapped - resolving one is a configuration
//! error and fails fast with a panic naming the type, the one failure in the
//! workspace that is not routed through the state store.
//!
//! ## Strategies
//!
//! Each strategy caches a per-locator source generator so repeated builds and
//! header refreshes for the same content reuse it; a request for different
//! content always gets a fresh generator, never a leaked one.

pub mod classify;
pub mod strategy;

pub use classify::infer_content_tag;
pub use strategy::{
    HlsSourceFactory, MediaSourceResolver, ProgressiveSourceFactory, SourceStrategy,
};
