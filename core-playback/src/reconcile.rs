//! # Progress Reconciliation Loop
//!
//! A cancellable, serialized periodic task that signals the engine to publish
//! fresh progress and, while the download subsystem is initialized, asks it
//! to refresh download progress too. The resulting events flow back through
//! the transport event stream and land in the store as actions.
//!
//! ## Lifecycle
//!
//! ```text
//! {Idle} --arm()--> {Running} --cancel()/re-arm--> {Idle}
//! ```
//!
//! At most one loop instance is active per session. Arming while running
//! replaces the previous instance: its in-flight tick finishes, its
//! cancellation path performs the final flush, and only the new instance
//! keeps ticking. Ticks are serialized - each one completes before the next
//! fires - so a slow engine never sees overlapping refresh signals.
//!
//! ## Failure policy
//!
//! A failed tick is retried on the next interval indefinitely; reconciliation
//! never ends silently. The one sanctioned terminal path is a closed command
//! channel, which is converted into a dispatched
//! [`UpdateProgressFailure`](core_state::PlayerError) and ends the loop. On
//! explicit cancellation one last refresh signal is sent so the state stays
//! current through the final event.

use crate::config::ReconcilerConfig;
use crate::transport::TransportSlot;
use bridge_traits::download::DownloadEngine;
use bridge_traits::playback::TransportCommand;
use core_state::{Action, PlayerError, StateStore};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

struct ActiveLoop {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owner-armed periodic reconciliation. Only the choreographer arms or
/// cancels it.
pub struct ProgressReconciler {
    store: Arc<StateStore>,
    transport: Arc<TransportSlot>,
    downloads: Arc<dyn DownloadEngine>,
    config: ReconcilerConfig,
    active: Mutex<Option<ActiveLoop>>,
}

impl ProgressReconciler {
    pub fn new(
        store: Arc<StateStore>,
        transport: Arc<TransportSlot>,
        downloads: Arc<dyn DownloadEngine>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            store,
            transport,
            downloads,
            config,
            active: Mutex::new(None),
        }
    }

    /// Start (or restart) the loop. A previously running instance is
    /// cancelled cooperatively and replaced by the new one.
    pub fn arm(&self) {
        let token = CancellationToken::new();
        let task = ReconcileTask {
            store: Arc::clone(&self.store),
            transport: Arc::clone(&self.transport),
            downloads: Arc::clone(&self.downloads),
            config: self.config.clone(),
            token: token.clone(),
        };
        let handle = tokio::spawn(task.run());

        let previous = self.active.lock().replace(ActiveLoop { token, handle });
        if let Some(previous) = previous {
            debug!("replacing running reconciliation loop");
            previous.token.cancel();
        }
    }

    /// Stop the loop. Returns the task handle so callers that need the final
    /// flush to have completed can await it.
    pub fn cancel(&self) -> Option<JoinHandle<()>> {
        self.active.lock().take().map(|active| {
            active.token.cancel();
            active.handle
        })
    }

    pub fn is_armed(&self) -> bool {
        self.active.lock().is_some()
    }
}

struct ReconcileTask {
    store: Arc<StateStore>,
    transport: Arc<TransportSlot>,
    downloads: Arc<dyn DownloadEngine>,
    config: ReconcilerConfig,
    token: CancellationToken,
}

impl ReconcileTask {
    #[instrument(skip(self), fields(interval_ms = self.config.tick_interval.as_millis() as u64))]
    async fn run(self) {
        let start = tokio::time::Instant::now() + self.config.tick_interval;
        let mut interval = tokio::time::interval_at(start, self.config.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("progress reconciliation armed");

        loop {
            tokio::select! {
                biased;

                _ = self.token.cancelled() => {
                    self.final_flush().await;
                    info!("progress reconciliation stopped");
                    return;
                }
                _ = interval.tick() => {
                    match self.tick().await {
                        Ok(()) => {}
                        Err(error) if error.is_transient() => {
                            warn!(%error, "reconciliation tick failed, will retry");
                        }
                        Err(error) => {
                            self.store.dispatch(Action::Error(
                                PlayerError::UpdateProgressFailure(format!(
                                    "reconciliation ended: {error}"
                                )),
                            ));
                            return;
                        }
                    }
                }
            }
        }
    }

    async fn tick(&self) -> bridge_traits::error::Result<()> {
        let Some(controls) = self.transport.get() else {
            // Armed ahead of the first connection; keep ticking until a
            // transport exists.
            debug!("no transport yet, skipping refresh");
            return Ok(());
        };
        controls
            .send_command(TransportCommand::RefreshProgress)
            .await?;

        if self.config.refresh_downloads && self.store.current().download_info.engine_initialized {
            self.downloads.refresh_progress().await?;
        }
        Ok(())
    }

    /// One last refresh on the way out, best effort.
    async fn final_flush(&self) {
        if let Some(controls) = self.transport.get() {
            if let Err(error) = controls.send_command(TransportCommand::RefreshProgress).await {
                debug!(%error, "final refresh signal failed");
            }
        }
    }
}
