//! # Choreographer Usage Example
//!
//! This example demonstrates how a host wires the playback orchestration core
//! to its engines: a simulated playback transport standing in for the native
//! engine and a no-op download store.
//!
//! Run with: `cargo run --example playback_demo --package core-playback`

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::playback::{
    Chapter, MediaRequest, PlaybackConnection, PlaybackConnector, PlaybackMetadata, PlaybackPhase,
    PlayableSource, StartOptions, TransportCommand, TransportControls, TransportEvent,
};
use bridge_traits::DownloadEngine;
use core_playback::{Choreographer, ChoreographerConfig, LogFormat, LoggingConfig};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

// ============================================================================
// Simulated Playback Engine (for demonstration)
// ============================================================================

/// An in-process "engine" that reports readiness shortly after connecting and
/// answers every refresh signal with an advancing playback position.
struct SimulatedEngine {
    events: mpsc::Sender<TransportEvent>,
    position: Mutex<Duration>,
    playing: Mutex<bool>,
    duration: Duration,
}

#[async_trait::async_trait]
impl TransportControls for SimulatedEngine {
    async fn start(&self, source: PlayableSource, options: StartOptions) -> BridgeResult<()> {
        println!(
            "engine: starting {} ({}) at {:?}",
            source.locator, source.content_tag, options.initial_offset
        );
        *self.position.lock() = options.initial_offset;
        *self.playing.lock() = options.is_auto_play;
        Ok(())
    }

    async fn stop(&self) -> BridgeResult<()> {
        println!("engine: stopped");
        *self.playing.lock() = false;
        Ok(())
    }

    async fn play(&self) -> BridgeResult<()> {
        println!("engine: playing");
        *self.playing.lock() = true;
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        println!("engine: paused");
        *self.playing.lock() = false;
        Ok(())
    }

    async fn seek_to(&self, position: Duration) -> BridgeResult<()> {
        println!("engine: seeking to {position:?}");
        *self.position.lock() = position;
        Ok(())
    }

    async fn send_command(&self, command: TransportCommand) -> BridgeResult<()> {
        match command {
            TransportCommand::RefreshProgress => {
                let position = {
                    let mut position = self.position.lock();
                    if *self.playing.lock() {
                        *position = (*position + Duration::from_millis(500)).min(self.duration);
                    }
                    *position
                };
                let phase = if *self.playing.lock() {
                    PlaybackPhase::Playing
                } else {
                    PlaybackPhase::Paused
                };
                let _ = self
                    .events
                    .send(TransportEvent::PhaseChanged {
                        phase,
                        position,
                        duration: Some(self.duration),
                    })
                    .await;
            }
            other => println!("engine: received {other:?}"),
        }
        Ok(())
    }
}

struct SimulatedConnector {
    duration: Duration,
}

#[async_trait::async_trait]
impl PlaybackConnector for SimulatedConnector {
    async fn connect(&self) -> BridgeResult<PlaybackConnection> {
        let (sender, receiver) = mpsc::channel(32);
        let engine = Arc::new(SimulatedEngine {
            events: sender.clone(),
            position: Mutex::new(Duration::ZERO),
            playing: Mutex::new(false),
            duration: self.duration,
        });

        // The engine initializes asynchronously: readiness arrives as an
        // event, not as part of connect().
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            let _ = sender.send(TransportEvent::Ready).await;
        });

        Ok(PlaybackConnection {
            controls: engine,
            events: receiver,
        })
    }
}

// ============================================================================
// No-op Download Store (for demonstration)
// ============================================================================

struct NullDownloads;

#[async_trait::async_trait]
impl DownloadEngine for NullDownloads {
    async fn init(&self) -> BridgeResult<()> {
        Ok(())
    }
    async fn download(&self, request: &MediaRequest) -> BridgeResult<()> {
        println!("downloads: enqueued {}", request.locator);
        Ok(())
    }
    async fn remove(&self, _request: &MediaRequest) -> BridgeResult<()> {
        Ok(())
    }
    async fn remove_all(&self) -> BridgeResult<()> {
        Ok(())
    }
    async fn refresh_progress(&self) -> BridgeResult<()> {
        Ok(())
    }
    async fn cached_size(&self) -> BridgeResult<u64> {
        Ok(0)
    }
    async fn clear_cache(&self) -> BridgeResult<()> {
        Ok(())
    }
}

// ============================================================================
// Main Demo
// ============================================================================

#[tokio::main]
async fn main() {
    core_playback::init_logging(
        LoggingConfig::new()
            .with_filter("info,core_playback=debug")
            .with_format(LogFormat::Compact),
    )
    .expect("logging init");

    let choreographer = Choreographer::new(
        Arc::new(SimulatedConnector {
            duration: Duration::from_secs(180),
        }),
        Arc::new(NullDownloads),
        ChoreographerConfig::default(),
    );

    let request = MediaRequest::new("https://cdn.example.com/audiobook/master.m3u8");
    choreographer
        .begin_playback(
            request,
            StartOptions {
                initial_offset: Duration::from_secs(10),
                is_auto_play: true,
                max_duration_discrepancy: 1,
            },
        )
        .await;

    // Preferences queue up while the engine is still initializing and fire
    // exactly once when it reports ready.
    choreographer.set_playback_speed(1.25);
    choreographer.set_skip_distance(Duration::from_secs(30));

    choreographer.update_metadata(PlaybackMetadata::new(
        "An Audiobook",
        vec![
            Chapter::new(Some("Opening".to_string()), Duration::ZERO, Duration::from_secs(60)),
            Chapter::new(
                Some("The Middle".to_string()),
                Duration::from_secs(60),
                Duration::from_secs(90),
            ),
            Chapter::new(
                Some("The End".to_string()),
                Duration::from_secs(150),
                Duration::from_secs(30),
            ),
        ],
    ));

    // Watch the snapshot stream while the reconciliation loop pulls progress.
    let mut changes = choreographer.state_changes();
    let watcher = tokio::spawn(async move {
        while let Ok(snapshot) = changes.recv().await {
            if let Some(info) = &snapshot.playback_info {
                println!(
                    "state: {:?} at {:?} (chapter {:?})",
                    info.phase,
                    info.position,
                    info.current_chapter().and_then(|(_, c)| c.title.clone()),
                );
            }
            if let Some(error) = &snapshot.error {
                println!("state: error {error}");
            }
        }
    });

    tokio::time::sleep(Duration::from_secs(2)).await;

    choreographer.skip_forward().await;
    tokio::time::sleep(Duration::from_secs(1)).await;

    choreographer.play_or_pause().await;
    tokio::time::sleep(Duration::from_secs(1)).await;

    choreographer.end_playback().await;
    choreographer.deinit().await;
    watcher.abort();

    println!("demo complete");
}
