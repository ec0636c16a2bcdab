//! Immutable state snapshot types.
//!
//! A [`PlayerState`] value is never edited in place: the reducer produces a
//! fresh snapshot for every dispatched action, so concurrent readers always
//! observe a complete, consistent value.

use crate::error::PlayerError;
use bridge_traits::playback::{Chapter, MediaRequest, PlaybackMetadata, PlaybackPhase};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Default skip distance applied until the caller overrides it.
pub const DEFAULT_SKIP_DISTANCE: Duration = Duration::from_secs(30);

/// Current playback phase, position and chapter data.
///
/// Absent (`None` on the snapshot) until the engine has reported at least one
/// phase change for loaded content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackInfo {
    pub phase: PlaybackPhase,
    pub position: Duration,
    pub duration: Option<Duration>,
    pub chapters: Vec<Chapter>,
}

impl PlaybackInfo {
    /// Index of the chapter containing `position`, if the chapter list covers
    /// it.
    pub fn chapter_index_at(&self, position: Duration) -> Option<usize> {
        self.chapters.iter().position(|c| c.contains(position))
    }

    /// Chapter containing the current position.
    pub fn current_chapter(&self) -> Option<(usize, &Chapter)> {
        let index = self.chapter_index_at(self.position)?;
        Some((index, &self.chapters[index]))
    }
}

/// Internal bookkeeping the engine feeds but callers rarely inspect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalState {
    /// Whether the playback engine has signaled that it accepts commands.
    pub is_engine_ready: bool,
}

/// Progress of one download, keyed by locator in [`DownloadInfo`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadProgress {
    /// Completed fraction in `0.0..=1.0`.
    pub fraction: f32,
    /// When the subsystem last reported this figure.
    pub updated_at: DateTime<Utc>,
}

/// Download subsystem state mirrored into the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadInfo {
    /// Whether the download engine has been initialized this process.
    pub engine_initialized: bool,
    /// Last reported progress per locator.
    pub progress: HashMap<String, DownloadProgress>,
}

/// One immutable snapshot of the full player state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Playback phase/position/chapters; `None` until content reports in.
    pub playback_info: Option<PlaybackInfo>,
    /// Engine-facing internals.
    pub internal: InternalState,
    /// Download subsystem mirror.
    pub download_info: DownloadInfo,
    /// The request currently loaded (or being loaded).
    pub media_request: Option<MediaRequest>,
    /// Display title and chapter list, as last pushed by the caller.
    pub metadata: Option<PlaybackMetadata>,
    /// Distance applied by skip-forward/skip-backward commands.
    pub skip_distance: Duration,
    /// Playback rate multiplier.
    pub playback_speed: f32,
    /// Host application foreground flag.
    pub is_in_foreground: bool,
    /// The most recent fault, cleared by the next successful progress or
    /// metadata update. This is the only failure channel callers observe.
    pub error: Option<PlayerError>,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            playback_info: None,
            internal: InternalState::default(),
            download_info: DownloadInfo::default(),
            media_request: None,
            metadata: None,
            skip_distance: DEFAULT_SKIP_DISTANCE,
            playback_speed: 1.0,
            is_in_foreground: false,
            error: None,
        }
    }
}

impl PlayerState {
    /// Phase recorded on the snapshot, when playback info exists.
    pub fn phase(&self) -> Option<PlaybackPhase> {
        self.playback_info.as_ref().map(|info| info.phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapters() -> Vec<Chapter> {
        vec![
            Chapter::new(None, Duration::ZERO, Duration::from_secs(60)),
            Chapter::new(None, Duration::from_secs(60), Duration::from_secs(90)),
            Chapter::new(None, Duration::from_secs(150), Duration::from_secs(30)),
        ]
    }

    #[test]
    fn chapter_lookup_by_position() {
        let info = PlaybackInfo {
            phase: PlaybackPhase::Playing,
            position: Duration::from_secs(70),
            duration: Some(Duration::from_secs(180)),
            chapters: chapters(),
        };

        assert_eq!(info.chapter_index_at(Duration::ZERO), Some(0));
        assert_eq!(info.chapter_index_at(Duration::from_secs(70)), Some(1));
        assert_eq!(info.chapter_index_at(Duration::from_secs(179)), Some(2));
        assert_eq!(info.chapter_index_at(Duration::from_secs(180)), None);

        let (index, chapter) = info.current_chapter().unwrap();
        assert_eq!(index, 1);
        assert_eq!(chapter.start_offset, Duration::from_secs(60));
    }

    #[test]
    fn default_snapshot_is_empty() {
        let state = PlayerState::default();
        assert!(state.playback_info.is_none());
        assert!(!state.internal.is_engine_ready);
        assert!(!state.download_info.engine_initialized);
        assert_eq!(state.skip_distance, DEFAULT_SKIP_DISTANCE);
        assert_eq!(state.playback_speed, 1.0);
        assert!(state.error.is_none());
        assert_eq!(state.phase(), None);
    }
}
