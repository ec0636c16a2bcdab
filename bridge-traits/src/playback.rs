//! Playback bridge traits and the value types shared across the bridge.
//!
//! These abstractions let the orchestration core drive a platform-specific
//! playback engine through its media-session transport while preserving a
//! consistent, async-first API surface. Host applications provide concrete
//! implementations that satisfy their platform constraints (desktop, mobile).
//!
//! The engine initializes asynchronously: [`PlaybackConnector::connect`]
//! resolves once a transport exists, but the engine signals actual readiness
//! later through [`TransportEvent::Ready`]. The core is responsible for
//! holding commands until that signal arrives.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Content classification inferred from a request's resource locator.
///
/// The set is closed on purpose: the resolver maps `Hls` and `Progressive` to
/// source strategies and treats everything else as a configuration error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentTag {
    /// MPEG-DASH manifest (`.mpd`).
    Dash,
    /// Microsoft Smooth Streaming manifest (`.ism`, `.isml`).
    SmoothStreaming,
    /// HTTP Live Streaming playlist (`.m3u8`).
    Hls,
    /// Anything else: a single progressive media file.
    Progressive,
}

impl ContentTag {
    /// Returns `true` for manifest-driven, segmented stream types.
    pub fn is_segmented(&self) -> bool {
        !matches!(self, ContentTag::Progressive)
    }
}

impl std::fmt::Display for ContentTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ContentTag::Dash => "DASH",
            ContentTag::SmoothStreaming => "SmoothStreaming",
            ContentTag::Hls => "HLS",
            ContentTag::Progressive => "Progressive",
        };
        f.write_str(name)
    }
}

/// A playable piece of content named by its resource locator.
///
/// The request is owned by the caller; the core only ever references it.
/// Identity for "is this the same content" is the locator alone - two
/// requests with different headers but the same locator address the same
/// content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRequest {
    /// Resource locator (URL or file path) of the content.
    pub locator: String,
    /// Headers the source loader must attach (e.g., authorization).
    pub headers: HashMap<String, String>,
    /// Explicit extension override for locators whose path does not reveal
    /// the container type (e.g., tokenized CDN URLs).
    pub extension_override: Option<String>,
}

impl MediaRequest {
    /// Create a request for the given locator with no headers.
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            headers: HashMap::new(),
            extension_override: None,
        }
    }

    /// Attach request headers.
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    /// Force classification through an explicit extension.
    pub fn with_extension_override(mut self, extension: impl Into<String>) -> Self {
        self.extension_override = Some(extension.into());
        self
    }

    /// Whether `other` addresses the same content as `self`.
    pub fn is_same_content(&self, other: &MediaRequest) -> bool {
        self.locator == other.locator
    }
}

/// One chapter marker within the loaded content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    /// Display title, when the publisher provides one.
    pub title: Option<String>,
    /// Offset of the chapter start from the beginning of the content.
    pub start_offset: Duration,
    /// Length of the chapter.
    pub duration: Duration,
}

impl Chapter {
    pub fn new(title: Option<String>, start_offset: Duration, duration: Duration) -> Self {
        Self {
            title,
            start_offset,
            duration,
        }
    }

    /// Offset of the first position past this chapter.
    pub fn end_offset(&self) -> Duration {
        self.start_offset + self.duration
    }

    /// Whether `position` falls inside this chapter.
    pub fn contains(&self, position: Duration) -> bool {
        position >= self.start_offset && position < self.end_offset()
    }
}

/// Display metadata for the loaded content: a title plus its chapter list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackMetadata {
    pub title: String,
    pub chapters: Vec<Chapter>,
}

impl PlaybackMetadata {
    pub fn new(title: impl Into<String>, chapters: Vec<Chapter>) -> Self {
        Self {
            title: title.into(),
            chapters,
        }
    }
}

/// Playback lifecycle phase as reported by the engine.
///
/// `None` is a sentinel meaning "no content loaded". Command-readiness checks
/// treat it as an error condition, not as a normal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackPhase {
    None,
    Loading,
    Playing,
    Paused,
    Stopped,
    Completed,
}

impl PlaybackPhase {
    /// Whether content is loaded, i.e. the phase is past the `None` sentinel.
    pub fn has_content(&self) -> bool {
        !matches!(self, PlaybackPhase::None)
    }
}

/// Configuration bundle carried by the transport "start" command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StartOptions {
    /// Position to begin playback from.
    pub initial_offset: Duration,
    /// Whether playback begins as soon as the engine has prepared the source.
    pub is_auto_play: bool,
    /// Largest tolerated difference, in seconds, between the duration the
    /// engine reports and the duration the request's metadata promised.
    pub max_duration_discrepancy: u32,
}

impl Default for StartOptions {
    fn default() -> Self {
        Self {
            initial_offset: Duration::ZERO,
            is_auto_play: true,
            max_duration_discrepancy: 1,
        }
    }
}

/// Source handle produced by the resolver and consumed by the transport.
///
/// Opaque to the core: the engine knows how to load a segmented or
/// progressive source from it, the core only routes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayableSource {
    pub locator: String,
    pub content_tag: ContentTag,
    pub headers: HashMap<String, String>,
}

/// The closed set of custom commands the core sends downstream.
///
/// Every command carries a typed payload; the engine is free to ignore tags
/// it does not understand, but the set itself never grows ad hoc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "payload")]
pub enum TransportCommand {
    /// Ask the engine to publish fresh progress and phase information.
    RefreshProgress,
    /// Change the playback rate.
    SetPlaybackSpeed(f32),
    /// Change the distance applied by the engine's own skip buttons.
    SetSkipDistance(Duration),
    /// Inform the engine of the host application's foreground state.
    SetIsInForeground(bool),
    /// Swap request details (headers, locator refresh) for the loaded content.
    UpdateMediaRequest(MediaRequest),
    /// Replace the engine's notion of title and chapters.
    UpdatePlaybackMetadata(PlaybackMetadata),
}

/// Backend-originated completion events.
///
/// The host may deliver these from any thread; the core marshals them onto
/// its store discipline before mutating shared state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum TransportEvent {
    /// The engine finished initializing and accepts commands.
    Ready,
    /// Progress/phase report, typically in response to a refresh signal.
    PhaseChanged {
        phase: PlaybackPhase,
        position: Duration,
        duration: Option<Duration>,
    },
    /// Download progress for one locator, from the download subsystem.
    DownloadProgress {
        locator: String,
        fraction: f32,
        updated_at: DateTime<Utc>,
    },
    /// The connection dropped; no further events will arrive.
    Disconnected,
    /// The engine reported a fault.
    Error(String),
}

/// Device-level command surface of an established transport connection.
#[async_trait::async_trait]
pub trait TransportControls: Send + Sync {
    /// Load the source and begin a playback session with the given options.
    async fn start(&self, source: PlayableSource, options: StartOptions) -> Result<()>;

    /// Stop playback and unload the current source.
    async fn stop(&self) -> Result<()>;

    /// Resume or begin playing the loaded content.
    async fn play(&self) -> Result<()>;

    /// Pause without unloading.
    async fn pause(&self) -> Result<()>;

    /// Seek to an absolute position within the loaded content.
    async fn seek_to(&self, position: Duration) -> Result<()>;

    /// Forward one of the closed custom command tags.
    async fn send_command(&self, command: TransportCommand) -> Result<()>;
}

/// An established connection: the control handle plus the event stream the
/// engine pushes completions through.
pub struct PlaybackConnection {
    pub controls: Arc<dyn TransportControls>,
    pub events: mpsc::Receiver<TransportEvent>,
}

/// Entry point for establishing a transport connection to the engine.
#[async_trait::async_trait]
pub trait PlaybackConnector: Send + Sync {
    /// Establish a fresh connection. Resolving only means a transport exists;
    /// engine readiness arrives later as [`TransportEvent::Ready`] on the
    /// returned event stream.
    async fn connect(&self) -> Result<PlaybackConnection>;
}
