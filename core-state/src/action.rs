//! Actions and the pure reducer.
//!
//! Actions are the only mutation channel: no component writes snapshot fields
//! directly. `reduce` is a pure function of `(previous snapshot, action)`;
//! the store applies it synchronously under its lock so every subscriber sees
//! the same monotonically-advancing sequence.

use crate::error::PlayerError;
use crate::state::{DownloadProgress, PlaybackInfo, PlayerState};
use bridge_traits::playback::{MediaRequest, PlaybackMetadata, PlaybackPhase};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The closed set of state mutations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload")]
pub enum Action {
    /// Record a classified fault in the snapshot's error field.
    Error(PlayerError),
    /// Replace the loaded media request. Callers must only send a request
    /// addressing the same content as the one currently loaded.
    MediaRequestUpdate(MediaRequest),
    /// Replace the display title and chapter list.
    MetadataUpdate(PlaybackMetadata),
    /// Change the skip-forward/skip-backward distance.
    SkipDistanceUpdate(Duration),
    /// Change the playback rate multiplier.
    PlaybackSpeedUpdate(f32),
    /// Record the host application foreground flag.
    ForegroundUpdate(bool),
    /// Fresh phase/position report pulled from the engine.
    ProgressUpdate {
        phase: PlaybackPhase,
        position: Duration,
        duration: Option<Duration>,
    },
    /// The engine's readiness flag changed.
    EngineReadyUpdate(bool),
    /// The download engine finished (or lost) initialization.
    DownloadEngineInitialized(bool),
    /// Progress report for one download.
    DownloadProgressUpdate {
        locator: String,
        fraction: f32,
        updated_at: DateTime<Utc>,
    },
    /// A new playback session begins: drop per-session state but keep caller
    /// preferences and the download engine's init flag.
    SessionReset,
}

/// Apply `action` to `state`, producing the next snapshot.
pub fn reduce(state: &PlayerState, action: &Action) -> PlayerState {
    let mut next = state.clone();
    match action {
        Action::Error(error) => {
            next.error = Some(error.clone());
        }
        Action::MediaRequestUpdate(request) => {
            next.media_request = Some(request.clone());
        }
        Action::MetadataUpdate(metadata) => {
            if let Some(info) = next.playback_info.as_mut() {
                info.chapters = metadata.chapters.clone();
            }
            next.metadata = Some(metadata.clone());
            next.error = None;
        }
        Action::SkipDistanceUpdate(distance) => {
            next.skip_distance = *distance;
        }
        Action::PlaybackSpeedUpdate(speed) => {
            next.playback_speed = *speed;
        }
        Action::ForegroundUpdate(foreground) => {
            next.is_in_foreground = *foreground;
        }
        Action::ProgressUpdate {
            phase,
            position,
            duration,
        } => {
            // Chapters survive progress reports; they only change through
            // MetadataUpdate.
            let chapters = next
                .playback_info
                .as_ref()
                .map(|info| info.chapters.clone())
                .or_else(|| next.metadata.as_ref().map(|m| m.chapters.clone()))
                .unwrap_or_default();
            next.playback_info = Some(PlaybackInfo {
                phase: *phase,
                position: *position,
                duration: *duration,
                chapters,
            });
            next.error = None;
        }
        Action::EngineReadyUpdate(ready) => {
            next.internal.is_engine_ready = *ready;
        }
        Action::DownloadEngineInitialized(initialized) => {
            next.download_info.engine_initialized = *initialized;
        }
        Action::DownloadProgressUpdate {
            locator,
            fraction,
            updated_at,
        } => {
            next.download_info.progress.insert(
                locator.clone(),
                DownloadProgress {
                    fraction: *fraction,
                    updated_at: *updated_at,
                },
            );
        }
        Action::SessionReset => {
            next = PlayerState {
                skip_distance: state.skip_distance,
                playback_speed: state.playback_speed,
                is_in_foreground: state.is_in_foreground,
                download_info: state.download_info.clone(),
                ..PlayerState::default()
            };
        }
    }
    next
}
