//! # Readiness Gate
//!
//! The policy layer deciding whether a command may run immediately, must be
//! deferred, or must error.
//!
//! Two entry points, both non-blocking:
//!
//! - [`ReadinessGate::run_if_ready`] inspects the current snapshot and either
//!   invokes the command or dispatches exactly one typed error, chosen by a
//!   fixed priority: missing transport, then missing phase, then the
//!   no-content sentinel phase, then engine-not-ready, then the catch-all.
//! - [`ReadinessGate::run_when_ready`] registers a one-shot continuation that
//!   fires on the first snapshot where a transport exists and the engine
//!   reports ready - at most once, however many not-ready snapshots precede
//!   it. The wait is unbounded by default; see
//!   [`DeferredCommandPolicy`](crate::config::DeferredCommandPolicy) for the
//!   opt-in timeout.
//!
//! Pending continuations are children of the session's cancellation registry:
//! tearing a session down cancels every deferred command that has not fired.

use crate::config::DeferredCommandPolicy;
use crate::transport::TransportSlot;
use bridge_traits::playback::{PlaybackPhase, TransportControls};
use core_state::store::RecvError;
use core_state::{Action, PlayerError, PlayerState, StateStore};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Readiness triple computed on demand from the current snapshot and the
/// transport slot. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessSnapshot {
    pub has_transport: bool,
    pub phase: Option<PlaybackPhase>,
    pub engine_ready: bool,
}

impl ReadinessSnapshot {
    /// Compute the triple for `state` against the current transport slot.
    pub fn capture(state: &PlayerState, transport: &TransportSlot) -> Self {
        Self {
            has_transport: transport.is_connected(),
            phase: state.phase(),
            engine_ready: state.internal.is_engine_ready,
        }
    }

    /// Prioritized readiness verdict. The match is exhaustive over the
    /// triple, so the verdict is deterministic: the first failing condition
    /// in priority order names the error.
    pub fn check(&self) -> Result<(), PlayerError> {
        match (self.has_transport, self.phase, self.engine_ready) {
            (false, _, _) => Err(PlayerError::TransportControlsNull(
                "no active playback connection".to_string(),
            )),
            (true, None, _) => Err(PlayerError::NoPlaybackInfo(
                "no playback phase recorded yet".to_string(),
            )),
            (true, Some(PlaybackPhase::None), _) => Err(PlayerError::InvalidPlaybackState(
                "playback phase is the no-content sentinel".to_string(),
            )),
            (true, Some(_), false) => Err(PlayerError::EngineNotInitialized(
                "playback engine has not signaled ready".to_string(),
            )),
            (true, Some(_), true) => Ok(()),
        }
    }
}

enum WaitOutcome {
    Ready(Arc<dyn TransportControls>),
    Failed(PlayerError),
}

/// Gatekeeper between the public command surface and the transport.
pub struct ReadinessGate {
    store: Arc<StateStore>,
    transport: Arc<TransportSlot>,
    policy: DeferredCommandPolicy,
    session: Mutex<CancellationToken>,
}

impl ReadinessGate {
    pub fn new(
        store: Arc<StateStore>,
        transport: Arc<TransportSlot>,
        policy: DeferredCommandPolicy,
    ) -> Self {
        Self {
            store,
            transport,
            policy,
            session: Mutex::new(CancellationToken::new()),
        }
    }

    /// Replace the cancellation registry deferred commands attach to. The
    /// caller cancels the previous token; commands pending on it die with it.
    pub fn bind_session(&self, token: CancellationToken) {
        *self.session.lock() = token;
    }

    /// Run `op` now if the engine is ready, otherwise dispatch exactly one
    /// error action. Callers never observe a failure as a return value.
    pub async fn run_if_ready<F, Fut>(&self, label: &'static str, op: F)
    where
        F: FnOnce(Arc<dyn TransportControls>) -> Fut,
        Fut: Future<Output = bridge_traits::error::Result<()>>,
    {
        let controls = self.transport.get();
        let state = self.store.current();
        let snapshot = ReadinessSnapshot {
            has_transport: controls.is_some(),
            phase: state.phase(),
            engine_ready: state.internal.is_engine_ready,
        };

        match (snapshot.check(), controls) {
            (Err(error), _) => {
                debug!(command = label, %error, "command rejected by readiness gate");
                self.store.dispatch(Action::Error(error));
            }
            (Ok(()), Some(controls)) => {
                if let Err(source) = op(controls).await {
                    self.store.dispatch(Action::Error(PlayerError::Unexpected(format!(
                        "{label} failed: {source}"
                    ))));
                }
            }
            // check() only passes when a transport was captured; keep the
            // taxonomy's catch-all as the landing spot regardless.
            (Ok(()), None) => {
                self.store.dispatch(Action::Error(PlayerError::Unexpected(format!(
                    "{label}: readiness passed without a transport"
                ))));
            }
        }
    }

    /// Register `op` to fire exactly once, on the first snapshot where a
    /// transport exists and the engine is ready. Returns immediately;
    /// concurrent registrations are independent.
    pub fn run_when_ready<F, Fut>(&self, label: &'static str, op: F)
    where
        F: FnOnce(Arc<dyn TransportControls>) -> Fut + Send + 'static,
        Fut: Future<Output = bridge_traits::error::Result<()>> + Send,
    {
        let store = Arc::clone(&self.store);
        let transport = Arc::clone(&self.transport);
        let token = self.session.lock().child_token();
        let timeout = self.policy.timeout;

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(command = label, "deferred command cancelled before readiness");
                }
                outcome = Self::await_readiness(&store, &transport, timeout) => match outcome {
                    WaitOutcome::Ready(controls) => {
                        debug!(command = label, "engine ready, firing deferred command");
                        if let Err(source) = op(controls).await {
                            store.dispatch(Action::Error(PlayerError::Unexpected(format!(
                                "{label} failed: {source}"
                            ))));
                        }
                    }
                    WaitOutcome::Failed(error) => {
                        store.dispatch(Action::Error(error));
                    }
                },
            }
        });
    }

    async fn await_readiness(
        store: &StateStore,
        transport: &TransportSlot,
        timeout: Option<Duration>,
    ) -> WaitOutcome {
        let wait = Self::first_ready(store, transport);
        match timeout {
            None => wait.await,
            Some(limit) => match tokio::time::timeout(limit, wait).await {
                Ok(outcome) => outcome,
                Err(_) => WaitOutcome::Failed(PlayerError::EngineNotInitialized(format!(
                    "deferred command timed out after {limit:?}"
                ))),
            },
        }
    }

    /// Wait for the first snapshot satisfying the deferred-readiness pair
    /// (transport present, engine ready). A closed snapshot stream resolves
    /// to a startup failure instead; lag only means intermediate snapshots
    /// were skipped, so the watcher re-checks the live state and keeps
    /// waiting.
    async fn first_ready(store: &StateStore, transport: &TransportSlot) -> WaitOutcome {
        let mut subscription = store.subscribe();
        loop {
            match subscription.recv().await {
                Ok(snapshot) => {
                    if snapshot.internal.is_engine_ready {
                        if let Some(controls) = transport.get() {
                            return WaitOutcome::Ready(controls);
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "readiness watcher lagged behind the store");
                    if store.current().internal.is_engine_ready {
                        if let Some(controls) = transport.get() {
                            return WaitOutcome::Ready(controls);
                        }
                    }
                }
                Err(error @ RecvError::Closed) => {
                    return WaitOutcome::Failed(PlayerError::PlaybackStartFailure(format!(
                        "readiness stream failed: {error}"
                    )));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::playback::{PlayableSource, StartOptions, TransportCommand};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingTransport {
        commands: Mutex<Vec<TransportCommand>>,
        plays: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl TransportControls for RecordingTransport {
        async fn start(&self, _source: PlayableSource, _options: StartOptions) -> BridgeResult<()> {
            Ok(())
        }
        async fn stop(&self) -> BridgeResult<()> {
            Ok(())
        }
        async fn play(&self) -> BridgeResult<()> {
            self.plays.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn pause(&self) -> BridgeResult<()> {
            Ok(())
        }
        async fn seek_to(&self, _position: Duration) -> BridgeResult<()> {
            Ok(())
        }
        async fn send_command(&self, command: TransportCommand) -> BridgeResult<()> {
            self.commands.lock().push(command);
            Ok(())
        }
    }

    fn ready_state(store: &StateStore) {
        store.dispatch(Action::ProgressUpdate {
            phase: PlaybackPhase::Paused,
            position: Duration::ZERO,
            duration: None,
        });
        store.dispatch(Action::EngineReadyUpdate(true));
    }

    fn gate_with(
        policy: DeferredCommandPolicy,
    ) -> (ReadinessGate, Arc<StateStore>, Arc<TransportSlot>) {
        let store = Arc::new(StateStore::default());
        let transport = Arc::new(TransportSlot::new());
        let gate = ReadinessGate::new(Arc::clone(&store), Arc::clone(&transport), policy);
        (gate, store, transport)
    }

    #[test]
    fn capture_reflects_the_slot_and_the_snapshot() {
        let store = StateStore::default();
        let transport = TransportSlot::new();

        let snapshot = ReadinessSnapshot::capture(&store.current(), &transport);
        assert!(!snapshot.has_transport);
        assert_eq!(snapshot.phase, None);
        assert!(!snapshot.engine_ready);

        transport.install(Arc::new(RecordingTransport::default()));
        ready_state(&store);

        let snapshot = ReadinessSnapshot::capture(&store.current(), &transport);
        assert!(snapshot.has_transport);
        assert_eq!(snapshot.phase, Some(PlaybackPhase::Paused));
        assert!(snapshot.engine_ready);
        assert!(snapshot.check().is_ok());
    }

    #[test]
    fn verdict_priority_is_deterministic() {
        // Missing transport outranks everything.
        let verdict = ReadinessSnapshot {
            has_transport: false,
            phase: None,
            engine_ready: false,
        }
        .check();
        assert!(matches!(verdict, Err(PlayerError::TransportControlsNull(_))));

        // Then missing phase.
        let verdict = ReadinessSnapshot {
            has_transport: true,
            phase: None,
            engine_ready: true,
        }
        .check();
        assert!(matches!(verdict, Err(PlayerError::NoPlaybackInfo(_))));

        // Then the sentinel phase, even with a ready engine.
        let verdict = ReadinessSnapshot {
            has_transport: true,
            phase: Some(PlaybackPhase::None),
            engine_ready: true,
        }
        .check();
        assert!(matches!(verdict, Err(PlayerError::InvalidPlaybackState(_))));

        // Then the readiness flag.
        let verdict = ReadinessSnapshot {
            has_transport: true,
            phase: Some(PlaybackPhase::Paused),
            engine_ready: false,
        }
        .check();
        assert!(matches!(verdict, Err(PlayerError::EngineNotInitialized(_))));

        let verdict = ReadinessSnapshot {
            has_transport: true,
            phase: Some(PlaybackPhase::Playing),
            engine_ready: true,
        }
        .check();
        assert!(verdict.is_ok());
    }

    #[tokio::test]
    async fn run_if_ready_rejects_with_exactly_one_error_action() {
        let (gate, store, _transport) = gate_with(DeferredCommandPolicy::unbounded());
        let mut subscription = store.subscribe();
        subscription.recv().await.unwrap(); // replay

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        gate.run_if_ready("play", move |_controls| async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await;

        assert_eq!(fired.load(Ordering::SeqCst), 0);

        // Exactly one snapshot was published, carrying the typed error.
        let snapshot = subscription.try_recv().unwrap().unwrap();
        assert!(matches!(
            snapshot.error,
            Some(PlayerError::TransportControlsNull(_))
        ));
        assert!(subscription.try_recv().is_none());
    }

    #[tokio::test]
    async fn run_if_ready_invokes_command_when_ready() {
        let (gate, store, transport) = gate_with(DeferredCommandPolicy::unbounded());
        let controls = Arc::new(RecordingTransport::default());
        transport.install(controls.clone());
        ready_state(&store);

        gate.run_if_ready("play", |controls| async move { controls.play().await })
            .await;

        assert_eq!(controls.plays.load(Ordering::SeqCst), 1);
        assert!(store.current().error.is_none());
    }

    #[tokio::test]
    async fn run_if_ready_wraps_command_failures() {
        let (gate, store, transport) = gate_with(DeferredCommandPolicy::unbounded());
        transport.install(Arc::new(RecordingTransport::default()));
        ready_state(&store);

        gate.run_if_ready("seek", |_controls| async move {
            Err(bridge_traits::BridgeError::OperationFailed(
                "engine refused".to_string(),
            ))
        })
        .await;

        assert!(matches!(
            store.current().error,
            Some(PlayerError::Unexpected(_))
        ));
    }

    #[tokio::test]
    async fn run_when_ready_fires_exactly_once_after_many_not_ready_snapshots() {
        let (gate, store, transport) = gate_with(DeferredCommandPolicy::unbounded());

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        gate.run_when_ready("set_speed", move |_controls| async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        // A thousand snapshots that never satisfy the pair.
        for _ in 0..1_000 {
            store.dispatch(Action::ForegroundUpdate(true));
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        transport.install(Arc::new(RecordingTransport::default()));
        store.dispatch(Action::EngineReadyUpdate(true));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // Further ready snapshots must not re-fire the command.
        store.dispatch(Action::EngineReadyUpdate(true));
        store.dispatch(Action::EngineReadyUpdate(true));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_deferred_commands_are_independent() {
        let (gate, store, transport) = gate_with(DeferredCommandPolicy::unbounded());

        let fired = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let counter = Arc::clone(&fired);
            gate.run_when_ready("deferred", move |_controls| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }

        transport.install(Arc::new(RecordingTransport::default()));
        store.dispatch(Action::EngineReadyUpdate(true));
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn cancelled_session_drops_pending_deferred_commands() {
        let (gate, store, transport) = gate_with(DeferredCommandPolicy::unbounded());
        let token = CancellationToken::new();
        gate.bind_session(token.clone());

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        gate.run_when_ready("doomed", move |_controls| async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        token.cancel();
        tokio::time::sleep(Duration::from_millis(10)).await;

        transport.install(Arc::new(RecordingTransport::default()));
        store.dispatch(Action::EngineReadyUpdate(true));
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 0);
        // Cancellation is silent: no error action either.
        assert!(store.current().error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_deferred_wait_times_out_with_an_error_action() {
        let (gate, store, _transport) =
            gate_with(DeferredCommandPolicy::with_timeout(Duration::from_secs(2)));

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        gate.run_when_ready("late", move |_controls| async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(matches!(
            store.current().error,
            Some(PlayerError::EngineNotInitialized(_))
        ));
    }
}
