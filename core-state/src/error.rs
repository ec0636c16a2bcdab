//! The closed failure taxonomy of the orchestration layer.
//!
//! Every expected failure is classified into exactly one of these variants,
//! wrapped into an [`Action::Error`](crate::Action) and dispatched to the
//! store - the single propagation point. Commands never surface failures as
//! return values; callers watch the snapshot's `error` field instead.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Typed playback faults, each carrying a human-readable detail string.
///
/// The enum is `Clone + PartialEq + Serialize` so it can live inside the
/// immutable state snapshot.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail")]
pub enum PlayerError {
    /// A playback or download engine was used before it finished
    /// initializing.
    #[error("Engine not initialized: {0}")]
    EngineNotInitialized(String),

    /// No playback phase has been recorded yet.
    #[error("No playback info: {0}")]
    NoPlaybackInfo(String),

    /// The recorded phase is the "no content loaded" sentinel.
    #[error("Invalid playback state: {0}")]
    InvalidPlaybackState(String),

    /// No active transport connection exists.
    #[error("Transport controls unavailable: {0}")]
    TransportControlsNull(String),

    /// The readiness-wait stream itself failed before the engine came up.
    #[error("Playback start failure: {0}")]
    PlaybackStartFailure(String),

    /// A progress reconciliation tick failed terminally.
    #[error("Progress update failure: {0}")]
    UpdateProgressFailure(String),

    /// Catch-all for states not otherwise classified.
    #[error("Unexpected failure: {0}")]
    Unexpected(String),
}

impl PlayerError {
    /// The detail string carried by the variant.
    pub fn detail(&self) -> &str {
        match self {
            PlayerError::EngineNotInitialized(detail)
            | PlayerError::NoPlaybackInfo(detail)
            | PlayerError::InvalidPlaybackState(detail)
            | PlayerError::TransportControlsNull(detail)
            | PlayerError::PlaybackStartFailure(detail)
            | PlayerError::UpdateProgressFailure(detail)
            | PlayerError::Unexpected(detail) => detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_string_is_preserved() {
        let error = PlayerError::TransportControlsNull("no active connection".to_string());
        assert_eq!(error.detail(), "no active connection");
        assert_eq!(
            error.to_string(),
            "Transport controls unavailable: no active connection"
        );
    }

    #[test]
    fn taxonomy_round_trips_through_serde() {
        let error = PlayerError::UpdateProgressFailure("tick failed".to_string());
        let json = serde_json::to_string(&error).unwrap();
        let back: PlayerError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, error);
    }
}
