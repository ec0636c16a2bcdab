//! Shared test doubles for the orchestration integration tests.

use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::playback::{
    MediaRequest, PlaybackConnection, PlaybackConnector, PlayableSource, StartOptions,
    TransportCommand, TransportControls, TransportEvent,
};
use bridge_traits::DownloadEngine;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Transport double recording everything the core forwards downstream.
#[derive(Default)]
pub struct FakeTransport {
    pub commands: Mutex<Vec<TransportCommand>>,
    pub seeks: Mutex<Vec<Duration>>,
    pub starts: Mutex<Vec<(PlayableSource, StartOptions)>>,
    pub plays: AtomicUsize,
    pub pauses: AtomicUsize,
    pub stops: AtomicUsize,
}

impl FakeTransport {
    pub fn command_count(&self, wanted: &TransportCommand) -> usize {
        self.commands
            .lock()
            .iter()
            .filter(|command| *command == wanted)
            .count()
    }

    pub fn refresh_count(&self) -> usize {
        self.command_count(&TransportCommand::RefreshProgress)
    }
}

#[async_trait::async_trait]
impl TransportControls for FakeTransport {
    async fn start(&self, source: PlayableSource, options: StartOptions) -> BridgeResult<()> {
        self.starts.lock().push((source, options));
        Ok(())
    }

    async fn stop(&self) -> BridgeResult<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn play(&self) -> BridgeResult<()> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        self.pauses.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn seek_to(&self, position: Duration) -> BridgeResult<()> {
        self.seeks.lock().push(position);
        Ok(())
    }

    async fn send_command(&self, command: TransportCommand) -> BridgeResult<()> {
        self.commands.lock().push(command);
        Ok(())
    }
}

/// Connector double handing out the shared [`FakeTransport`] and keeping the
/// sender side of the event stream so tests can play the engine's role.
pub struct FakeConnector {
    pub transport: Arc<FakeTransport>,
    pub event_sender: Mutex<Option<mpsc::Sender<TransportEvent>>>,
    pub connects: AtomicUsize,
    pub fail_next: AtomicBool,
}

impl FakeConnector {
    pub fn new(transport: Arc<FakeTransport>) -> Self {
        Self {
            transport,
            event_sender: Mutex::new(None),
            connects: AtomicUsize::new(0),
            fail_next: AtomicBool::new(false),
        }
    }

    /// Deliver an engine event on the most recent connection.
    pub async fn push(&self, event: TransportEvent) {
        let sender = self
            .event_sender
            .lock()
            .clone()
            .expect("no connection established");
        sender.send(event).await.expect("event pump is gone");
    }
}

#[async_trait::async_trait]
impl PlaybackConnector for FakeConnector {
    async fn connect(&self) -> BridgeResult<PlaybackConnection> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(BridgeError::NotAvailable("engine offline".to_string()));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = mpsc::channel(32);
        *self.event_sender.lock() = Some(sender);
        Ok(PlaybackConnection {
            controls: Arc::clone(&self.transport) as Arc<dyn TransportControls>,
            events: receiver,
        })
    }
}

/// Download engine double with per-operation counters.
#[derive(Default)]
pub struct FakeDownloadEngine {
    pub inits: AtomicUsize,
    pub downloads: Mutex<Vec<String>>,
    pub removals: Mutex<Vec<String>>,
    pub remove_alls: AtomicUsize,
    pub progress_refreshes: AtomicUsize,
    pub clear_caches: AtomicUsize,
    pub cached_bytes: AtomicUsize,
    pub fail_init: AtomicBool,
}

#[async_trait::async_trait]
impl DownloadEngine for FakeDownloadEngine {
    async fn init(&self) -> BridgeResult<()> {
        if self.fail_init.load(Ordering::SeqCst) {
            return Err(BridgeError::OperationFailed("no storage".to_string()));
        }
        self.inits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn download(&self, request: &MediaRequest) -> BridgeResult<()> {
        self.downloads.lock().push(request.locator.clone());
        Ok(())
    }

    async fn remove(&self, request: &MediaRequest) -> BridgeResult<()> {
        self.removals.lock().push(request.locator.clone());
        Ok(())
    }

    async fn remove_all(&self) -> BridgeResult<()> {
        self.remove_alls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn refresh_progress(&self) -> BridgeResult<()> {
        self.progress_refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn cached_size(&self) -> BridgeResult<u64> {
        Ok(self.cached_bytes.load(Ordering::SeqCst) as u64)
    }

    async fn clear_cache(&self) -> BridgeResult<()> {
        self.clear_caches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
