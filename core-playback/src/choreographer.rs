//! # Choreographer
//!
//! The public-facing command surface of the playback core. Every command
//! falls into one of three readiness classes:
//!
//! - **Immediate-or-error** (play/pause, seeks, skips, chapter navigation):
//!   routed through [`ReadinessGate::run_if_ready`]; a caller that is too
//!   early observes a dispatched error action, never a returned error.
//! - **Deferred** (skip distance, playback speed, foreground flag, request
//!   and metadata updates): the store mutation lands immediately, the
//!   matching transport custom command is queued through
//!   [`ReadinessGate::run_when_ready`] and fires exactly once when the
//!   engine comes up.
//! - **Lifecycle** (`begin_playback`, `end_playback`, `deinit`, download
//!   engine init/teardown): these bypass the gate - they establish or tear
//!   down the very connection the gate depends on - and are safe to call
//!   redundantly.

use crate::config::ChoreographerConfig;
use crate::readiness::ReadinessGate;
use crate::reconcile::ProgressReconciler;
use crate::transport::TransportSlot;
use bridge_traits::download::DownloadEngine;
use bridge_traits::playback::{
    MediaRequest, PlaybackConnector, PlaybackMetadata, PlaybackPhase, StartOptions,
    TransportCommand, TransportEvent,
};
use core_source::MediaSourceResolver;
use core_state::{Action, PlayerError, PlayerState, StateStore, StateSubscription};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Identifier for one begin/end playback cycle, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The session's cancellation registry ("disposables"): every pending
/// deferred command and the transport event pump hang off this token.
struct Session {
    id: Option<SessionId>,
    disposables: CancellationToken,
}

/// Orchestrates the store, the readiness gate, the reconciliation loop and
/// the external engines behind one command surface.
pub struct Choreographer {
    store: Arc<StateStore>,
    resolver: MediaSourceResolver,
    connector: Arc<dyn PlaybackConnector>,
    downloads: Arc<dyn DownloadEngine>,
    transport: Arc<TransportSlot>,
    gate: ReadinessGate,
    reconciler: ProgressReconciler,
    session: Mutex<Session>,
}

impl Choreographer {
    /// Build a choreographer over the host-provided engines.
    ///
    /// # Panics
    ///
    /// Panics when `config` fails validation; a malformed configuration is a
    /// programming error, not a runtime condition.
    pub fn new(
        connector: Arc<dyn PlaybackConnector>,
        downloads: Arc<dyn DownloadEngine>,
        config: ChoreographerConfig,
    ) -> Self {
        if let Err(reason) = config.validate() {
            panic!("invalid choreographer configuration: {reason}");
        }

        let store = Arc::new(StateStore::default());
        let transport = Arc::new(TransportSlot::new());
        let gate = ReadinessGate::new(Arc::clone(&store), Arc::clone(&transport), config.deferred);
        let reconciler = ProgressReconciler::new(
            Arc::clone(&store),
            Arc::clone(&transport),
            Arc::clone(&downloads),
            config.reconciler,
        );

        Self {
            store,
            resolver: MediaSourceResolver::new(),
            connector,
            downloads,
            transport,
            gate,
            reconciler,
            session: Mutex::new(Session {
                id: None,
                disposables: CancellationToken::new(),
            }),
        }
    }

    // ========================================================================
    // Lifecycle commands
    // ========================================================================

    /// Start a playback session for `request`.
    ///
    /// Clears any prior session's subscriptions first, so redundant calls
    /// leave exactly one live pipeline: the latest. The reconciliation loop
    /// is armed before the connection attempt and re-armed once it confirms,
    /// since either may be the session's first readiness signal.
    pub async fn begin_playback(&self, request: MediaRequest, options: StartOptions) {
        let session_id = SessionId::new();
        info!(%session_id, locator = %request.locator, "beginning playback");

        let disposables = self.reset_session(session_id);
        self.transport.clear();

        self.store.dispatch(Action::SessionReset);
        self.store.dispatch(Action::MediaRequestUpdate(request.clone()));

        let source = self.resolver.build_source(&request);

        self.reconciler.arm();

        match self.connector.connect().await {
            Ok(connection) => {
                self.transport.install(Arc::clone(&connection.controls));
                self.spawn_event_pump(connection.events, disposables.child_token());
                self.reconciler.arm();
                debug!(%session_id, "transport connected, issuing start");
                if let Err(error) = connection.controls.start(source, options).await {
                    self.store
                        .dispatch(Action::Error(PlayerError::PlaybackStartFailure(format!(
                            "start command failed: {error}"
                        ))));
                }
            }
            Err(error) => {
                self.store
                    .dispatch(Action::Error(PlayerError::PlaybackStartFailure(format!(
                        "transport connection failed: {error}"
                    ))));
            }
        }
    }

    /// Stop the current session's playback, flushing progress one last time
    /// before the stop command lands.
    pub async fn end_playback(&self) {
        info!("ending playback");
        if let Some(flush) = self.reconciler.cancel() {
            let _ = flush.await;
        }
        if let Some(controls) = self.transport.get() {
            if let Err(error) = controls.stop().await {
                self.store
                    .dispatch(Action::Error(PlayerError::Unexpected(format!(
                        "stop command failed: {error}"
                    ))));
            }
        }
    }

    /// Tear the core down: cancel pending deferred commands, stop the
    /// reconciliation loop (with its final flush) and drop the connection.
    /// Safe to call redundantly.
    pub async fn deinit(&self) {
        info!("deinitializing playback core");
        {
            let mut session = self.session.lock();
            session.disposables.cancel();
            session.id = None;
        }
        if let Some(flush) = self.reconciler.cancel() {
            let _ = flush.await;
        }
        self.transport.clear();
    }

    /// Initialize the download engine. This may be the session's first
    /// readiness signal, so the reconciliation loop is (re-)armed on success.
    pub async fn init_download_engine(&self) {
        match self.downloads.init().await {
            Ok(()) => {
                info!("download engine initialized");
                self.store.dispatch(Action::DownloadEngineInitialized(true));
                self.reconciler.arm();
            }
            Err(error) => {
                self.store
                    .dispatch(Action::Error(PlayerError::EngineNotInitialized(format!(
                        "download engine init failed: {error}"
                    ))));
            }
        }
    }

    /// Mark the download engine unavailable again.
    pub fn teardown_download_engine(&self) {
        info!("download engine torn down");
        self.store.dispatch(Action::DownloadEngineInitialized(false));
    }

    // ========================================================================
    // Immediate-or-error commands
    // ========================================================================

    /// Toggle between playing and paused.
    pub async fn play_or_pause(&self) {
        let store = Arc::clone(&self.store);
        self.gate
            .run_if_ready("play_or_pause", move |controls| async move {
                match store.current().phase() {
                    Some(PlaybackPhase::Playing) => controls.pause().await,
                    _ => controls.play().await,
                }
            })
            .await;
    }

    /// Seek to an absolute position.
    pub async fn seek_to(&self, position: Duration) {
        self.gate
            .run_if_ready("seek_to", move |controls| async move {
                controls.seek_to(position).await
            })
            .await;
    }

    /// Seek to a percentage point within the current chapter (falling back
    /// to the whole content when no chapter covers the position).
    pub async fn seek_within_chapter(&self, percent: f32) {
        let store = Arc::clone(&self.store);
        self.gate
            .run_if_ready("seek_within_chapter", move |controls| async move {
                let state = store.current();
                let Some(info) = state.playback_info else {
                    return Ok(());
                };
                let fraction = percent.clamp(0.0, 100.0) / 100.0;
                let target = match info.current_chapter() {
                    Some((_, chapter)) => chapter.start_offset + chapter.duration.mul_f32(fraction),
                    None => match info.duration {
                        Some(total) => total.mul_f32(fraction),
                        None => return Ok(()),
                    },
                };
                controls.seek_to(target).await
            })
            .await;
    }

    /// Jump forward by the configured skip distance, clamped to the content
    /// duration when known.
    pub async fn skip_forward(&self) {
        let store = Arc::clone(&self.store);
        self.gate
            .run_if_ready("skip_forward", move |controls| async move {
                let state = store.current();
                let Some(info) = state.playback_info else {
                    return Ok(());
                };
                let target = info.position.saturating_add(state.skip_distance);
                let target = match info.duration {
                    Some(total) => target.min(total),
                    None => target,
                };
                controls.seek_to(target).await
            })
            .await;
    }

    /// Jump backward by the configured skip distance.
    pub async fn skip_backward(&self) {
        let store = Arc::clone(&self.store);
        self.gate
            .run_if_ready("skip_backward", move |controls| async move {
                let state = store.current();
                let Some(info) = state.playback_info else {
                    return Ok(());
                };
                let target = info.position.saturating_sub(state.skip_distance);
                controls.seek_to(target).await
            })
            .await;
    }

    /// Seek to the start of the next chapter, when one exists.
    pub async fn next_chapter(&self) {
        let store = Arc::clone(&self.store);
        self.gate
            .run_if_ready("next_chapter", move |controls| async move {
                let state = store.current();
                let Some(info) = state.playback_info else {
                    return Ok(());
                };
                let next = info
                    .chapter_index_at(info.position)
                    .and_then(|index| info.chapters.get(index + 1));
                match next {
                    Some(chapter) => controls.seek_to(chapter.start_offset).await,
                    None => {
                        debug!("no next chapter to navigate to");
                        Ok(())
                    }
                }
            })
            .await;
    }

    /// Seek to the start of the previous chapter, or of the current one when
    /// already in the first.
    pub async fn previous_chapter(&self) {
        let store = Arc::clone(&self.store);
        self.gate
            .run_if_ready("previous_chapter", move |controls| async move {
                let state = store.current();
                let Some(info) = state.playback_info else {
                    return Ok(());
                };
                let target = match info.chapter_index_at(info.position) {
                    Some(index) if index > 0 => info.chapters[index - 1].start_offset,
                    Some(index) => info.chapters[index].start_offset,
                    None => Duration::ZERO,
                };
                controls.seek_to(target).await
            })
            .await;
    }

    // ========================================================================
    // Deferred commands
    // ========================================================================

    /// Change the skip distance. The store reflects the new value at once;
    /// the engine learns about it when it is ready.
    pub fn set_skip_distance(&self, distance: Duration) {
        self.store.dispatch(Action::SkipDistanceUpdate(distance));
        self.gate
            .run_when_ready("set_skip_distance", move |controls| async move {
                controls
                    .send_command(TransportCommand::SetSkipDistance(distance))
                    .await
            });
    }

    /// Change the playback rate.
    pub fn set_playback_speed(&self, speed: f32) {
        self.store.dispatch(Action::PlaybackSpeedUpdate(speed));
        self.gate
            .run_when_ready("set_playback_speed", move |controls| async move {
                controls
                    .send_command(TransportCommand::SetPlaybackSpeed(speed))
                    .await
            });
    }

    /// Record the host application's foreground state.
    pub fn set_is_in_foreground(&self, foreground: bool) {
        self.store.dispatch(Action::ForegroundUpdate(foreground));
        self.gate
            .run_when_ready("set_is_in_foreground", move |controls| async move {
                controls
                    .send_command(TransportCommand::SetIsInForeground(foreground))
                    .await
            });
    }

    /// Swap request details for the loaded content - fresh headers, a
    /// refreshed locator. Sending a request for *different* content is a
    /// caller contract violation and only produces an error action.
    pub fn update_media_request(&self, request: MediaRequest) {
        if let Some(current) = self.store.current().media_request {
            if !current.is_same_content(&request) {
                warn!(
                    current = %current.locator,
                    requested = %request.locator,
                    "update_media_request called with different content"
                );
                self.store
                    .dispatch(Action::Error(PlayerError::Unexpected(format!(
                        "update_media_request must address the loaded content \
                         (loaded {}, got {})",
                        current.locator, request.locator
                    ))));
                return;
            }
        }

        self.resolver.refresh_headers(&request);
        self.store
            .dispatch(Action::MediaRequestUpdate(request.clone()));
        self.gate
            .run_when_ready("update_media_request", move |controls| async move {
                controls
                    .send_command(TransportCommand::UpdateMediaRequest(request))
                    .await
            });
    }

    /// Replace the display title and chapter list.
    pub fn update_metadata(&self, metadata: PlaybackMetadata) {
        self.store.dispatch(Action::MetadataUpdate(metadata.clone()));
        self.gate
            .run_when_ready("update_metadata", move |controls| async move {
                controls
                    .send_command(TransportCommand::UpdatePlaybackMetadata(metadata))
                    .await
            });
    }

    // ========================================================================
    // Download commands
    // ========================================================================

    /// Enqueue a download.
    pub async fn download(&self, request: &MediaRequest) {
        if !self.download_engine_ready("download") {
            return;
        }
        if let Err(error) = self.downloads.download(request).await {
            self.store
                .dispatch(Action::Error(PlayerError::Unexpected(format!(
                    "download failed: {error}"
                ))));
        }
    }

    /// Remove one download.
    pub async fn remove_download(&self, request: &MediaRequest) {
        if !self.download_engine_ready("remove_download") {
            return;
        }
        if let Err(error) = self.downloads.remove(request).await {
            self.store
                .dispatch(Action::Error(PlayerError::Unexpected(format!(
                    "remove_download failed: {error}"
                ))));
        }
    }

    /// Remove every download.
    pub async fn remove_all_downloads(&self) {
        if !self.download_engine_ready("remove_all_downloads") {
            return;
        }
        if let Err(error) = self.downloads.remove_all().await {
            self.store
                .dispatch(Action::Error(PlayerError::Unexpected(format!(
                    "remove_all_downloads failed: {error}"
                ))));
        }
    }

    /// Total bytes held by the media cache. `None` when the query could not
    /// be answered; the reason arrives as an error action.
    pub async fn cached_size(&self) -> Option<u64> {
        if !self.download_engine_ready("cached_size") {
            return None;
        }
        match self.downloads.cached_size().await {
            Ok(size) => Some(size),
            Err(error) => {
                self.store
                    .dispatch(Action::Error(PlayerError::Unexpected(format!(
                        "cached_size failed: {error}"
                    ))));
                None
            }
        }
    }

    /// Evict all cached media.
    pub async fn clear_cache(&self) {
        if !self.download_engine_ready("clear_cache") {
            return;
        }
        if let Err(error) = self.downloads.clear_cache().await {
            self.store
                .dispatch(Action::Error(PlayerError::Unexpected(format!(
                    "clear_cache failed: {error}"
                ))));
        }
    }

    // ========================================================================
    // Observation
    // ========================================================================

    /// The latest snapshot.
    pub fn current_state(&self) -> PlayerState {
        self.store.current()
    }

    /// Subscribe to snapshots, latest first. This is the listener surface:
    /// every state change - including dispatched errors - arrives here.
    pub fn state_changes(&self) -> StateSubscription {
        self.store.subscribe()
    }

    /// Identifier of the active session, if one was begun.
    pub fn session_id(&self) -> Option<SessionId> {
        self.session.lock().id
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn reset_session(&self, id: SessionId) -> CancellationToken {
        let mut session = self.session.lock();
        session.disposables.cancel();
        let fresh = CancellationToken::new();
        session.disposables = fresh.clone();
        session.id = Some(id);
        self.gate.bind_session(fresh.clone());
        fresh
    }

    /// Marshal backend completions onto the store discipline. The pump dies
    /// with the session's disposables or when the engine closes the stream.
    fn spawn_event_pump(&self, mut events: mpsc::Receiver<TransportEvent>, token: CancellationToken) {
        let store = Arc::clone(&self.store);
        let transport = Arc::clone(&self.transport);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;

                    _ = token.cancelled() => break,
                    event = events.recv() => match event {
                        Some(event) => Self::apply_transport_event(&store, &transport, event),
                        None => {
                            debug!("transport event stream ended");
                            store.dispatch(Action::EngineReadyUpdate(false));
                            break;
                        }
                    },
                }
            }
            debug!("transport event pump stopped");
        });
    }

    fn apply_transport_event(store: &StateStore, transport: &TransportSlot, event: TransportEvent) {
        match event {
            TransportEvent::Ready => store.dispatch(Action::EngineReadyUpdate(true)),
            TransportEvent::PhaseChanged {
                phase,
                position,
                duration,
            } => store.dispatch(Action::ProgressUpdate {
                phase,
                position,
                duration,
            }),
            TransportEvent::DownloadProgress {
                locator,
                fraction,
                updated_at,
            } => store.dispatch(Action::DownloadProgressUpdate {
                locator,
                fraction,
                updated_at,
            }),
            TransportEvent::Disconnected => {
                transport.clear();
                store.dispatch(Action::EngineReadyUpdate(false));
            }
            TransportEvent::Error(message) => {
                store.dispatch(Action::Error(PlayerError::Unexpected(format!(
                    "engine fault: {message}"
                ))));
            }
        }
    }

    fn download_engine_ready(&self, label: &str) -> bool {
        if self.store.current().download_info.engine_initialized {
            return true;
        }
        self.store
            .dispatch(Action::Error(PlayerError::EngineNotInitialized(format!(
                "{label} called before init_download_engine"
            ))));
        false
    }
}
