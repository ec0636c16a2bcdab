//! # Orchestration Configuration
//!
//! Configuration types for the reconciliation loop and the deferred-command
//! policy of the readiness gate.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reconciliation loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Delay between reconciliation ticks.
    ///
    /// Ticks are serialized: a slow tick pushes the next one out rather than
    /// overlapping it.
    ///
    /// Default: 500ms.
    #[serde(default = "default_tick_interval")]
    pub tick_interval: Duration,

    /// Whether ticks also request a download-progress refresh while the
    /// download engine is initialized.
    ///
    /// Default: true.
    #[serde(default = "default_refresh_downloads")]
    pub refresh_downloads: bool,
}

fn default_tick_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_refresh_downloads() -> bool {
    true
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            tick_interval: default_tick_interval(),
            refresh_downloads: default_refresh_downloads(),
        }
    }
}

impl ReconcilerConfig {
    /// Set the tick interval.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Enable or disable download-progress refreshes.
    pub fn with_refresh_downloads(mut self, enabled: bool) -> Self {
        self.refresh_downloads = enabled;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.tick_interval.is_zero() {
            return Err("tick_interval must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// How long a deferred command may wait for engine readiness.
///
/// The default waits indefinitely, matching the gate's contract that a
/// deferred command fires on the first ready snapshot whenever that arrives.
/// Setting a timeout makes the wait bounded: on expiry the pending command is
/// dropped and an `EngineNotInitialized` error action is dispatched instead.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DeferredCommandPolicy {
    /// Maximum wait, `None` for unbounded.
    pub timeout: Option<Duration>,
}

impl DeferredCommandPolicy {
    /// Wait indefinitely for readiness.
    pub fn unbounded() -> Self {
        Self { timeout: None }
    }

    /// Give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

/// Top-level configuration bundle for a [`Choreographer`](crate::Choreographer).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChoreographerConfig {
    #[serde(default)]
    pub reconciler: ReconcilerConfig,
    #[serde(default)]
    pub deferred: DeferredCommandPolicy,
}

impl ChoreographerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reconciler(mut self, reconciler: ReconcilerConfig) -> Self {
        self.reconciler = reconciler;
        self
    }

    pub fn with_deferred_policy(mut self, deferred: DeferredCommandPolicy) -> Self {
        self.deferred = deferred;
        self
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), String> {
        self.reconciler.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_cadence() {
        let config = ReconcilerConfig::default();
        assert_eq!(config.tick_interval, Duration::from_millis(500));
        assert!(config.refresh_downloads);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let config = ReconcilerConfig::default().with_tick_interval(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn deferred_policy_defaults_to_unbounded() {
        let policy = DeferredCommandPolicy::default();
        assert!(policy.timeout.is_none());

        let bounded = DeferredCommandPolicy::with_timeout(Duration::from_secs(5));
        assert_eq!(bounded.timeout, Some(Duration::from_secs(5)));
    }
}
