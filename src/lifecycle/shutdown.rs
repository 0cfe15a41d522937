//! Shutdown sequencing.
//!
//! # States
//! - Running: server accepting connections, signal source armed
//! - ShuttingDown: signal received, server draining
//! - CleaningUp: drain finished, cleanup actions running
//! - Done: completion reported to the waiting task
//!
//! # State Transitions
//! ```text
//! Running → ShuttingDown: first signal from the source
//! ShuttingDown → CleaningUp: drain finished (or failed under `cleanup` policy)
//! CleaningUp → Done: cleanup returned, whatever the individual results
//! ```
//!
//! # Design Decisions
//! - Single-shot: one signal drives one sequence, the source is not re-armed
//! - The drain and cleanup deadlines are allocated when their phase begins
//! - Completion is a oneshot channel, separate from the OS signal

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, watch};

use crate::cleanup::{CleanupFailure, ResourceCleaner};
use crate::config::schema::DEFAULT_TIMEOUT_SECS;
use crate::http::{DrainError, ServerHandle};
use crate::lifecycle::signals::{ShutdownSignal, SignalSource};
use crate::observability::metrics;

/// What to do when in-flight requests outlive the shutdown timeout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainTimeoutPolicy {
    /// Treat the drain failure as fatal and skip resource cleanup.
    #[default]
    Abort,
    /// Log the drain failure and run resource cleanup anyway.
    Cleanup,
}

/// Independent deadlines for the two shutdown phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownBudgets {
    /// Bounds draining in-flight requests.
    pub shutdown: Duration,
    /// Bounds running cleanup actions.
    pub cleanup: Duration,
}

impl Default for ShutdownBudgets {
    fn default() -> Self {
        Self {
            shutdown: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            cleanup: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Lifecycle phase, in the order they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Running,
    ShuttingDown,
    CleaningUp,
    Done,
}

impl Phase {
    fn as_str(self) -> &'static str {
        match self {
            Phase::Running => "running",
            Phase::ShuttingDown => "shutting_down",
            Phase::CleaningUp => "cleaning_up",
            Phase::Done => "done",
        }
    }

    fn ordinal(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a completed shutdown sequence.
#[derive(Debug)]
pub struct ShutdownReport {
    /// The signal that started the sequence.
    pub signal: ShutdownSignal,
    /// Whether every in-flight request finished within the shutdown timeout.
    pub drained: bool,
    /// Failed cleanup actions, in registration order.
    pub cleanup_failures: Vec<CleanupFailure>,
    /// Time from the signal to completion.
    pub elapsed: Duration,
}

impl ShutdownReport {
    /// Drained in time and every cleanup action succeeded.
    pub fn is_clean(&self) -> bool {
        self.drained && self.cleanup_failures.is_empty()
    }
}

/// Fatal shutdown outcomes.
#[derive(Debug, thiserror::Error)]
pub enum ShutdownError {
    #[error("Server forced to shutdown: {0}")]
    Drain(#[from] DrainError),

    #[error("Shutdown sequencer exited without reporting completion")]
    Abandoned,
}

/// Drives the ordered shutdown once a signal arrives.
pub struct ShutdownSequencer<S> {
    signals: S,
    cleaner: Arc<ResourceCleaner>,
    budgets: ShutdownBudgets,
    policy: DrainTimeoutPolicy,
    phase: watch::Sender<Phase>,
}

impl<S: SignalSource> ShutdownSequencer<S> {
    /// Create a sequencer in the `Running` phase.
    ///
    /// `signals` should already be armed so nothing delivered before
    /// [`spawn`](Self::spawn) is lost.
    pub fn new(signals: S, cleaner: Arc<ResourceCleaner>, budgets: ShutdownBudgets) -> Self {
        let (phase, _) = watch::channel(Phase::Running);
        Self {
            signals,
            cleaner,
            budgets,
            policy: DrainTimeoutPolicy::default(),
            phase,
        }
    }

    pub fn with_drain_timeout_policy(mut self, policy: DrainTimeoutPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Observe phase transitions.
    pub fn phases(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    /// Start watching for a signal on a background task.
    ///
    /// The returned [`Completion`] resolves once, when the sequence ends.
    pub fn spawn(self, server: ServerHandle) -> Completion {
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let outcome = self.run(server).await;
            if tx.send(outcome).is_err() {
                tracing::debug!("Shutdown completed with nobody waiting");
            }
        });
        Completion { rx }
    }

    async fn run(mut self, server: ServerHandle) -> Result<ShutdownReport, ShutdownError> {
        let signal = self.signals.wait().await;
        let started = Instant::now();
        tracing::info!(signal = %signal, "Received signal, starting server shutdown");

        self.enter(Phase::ShuttingDown);
        let drained = match server.shutdown(self.budgets.shutdown).await {
            Ok(()) => true,
            Err(e) => match self.policy {
                DrainTimeoutPolicy::Abort => {
                    tracing::error!(
                        error = %e,
                        phase = %Phase::ShuttingDown,
                        shutdown_timeout_ms = self.budgets.shutdown.as_millis() as u64,
                        "Server forced to shutdown, skipping resource cleanup"
                    );
                    return Err(ShutdownError::Drain(e));
                }
                DrainTimeoutPolicy::Cleanup => {
                    tracing::warn!(
                        error = %e,
                        phase = %Phase::ShuttingDown,
                        shutdown_timeout_ms = self.budgets.shutdown.as_millis() as u64,
                        "Server drain failed, cleaning up resources anyway"
                    );
                    false
                }
            },
        };
        metrics::record_phase_duration(Phase::ShuttingDown.as_str(), started.elapsed());

        self.enter(Phase::CleaningUp);
        let cleanup_started = Instant::now();
        let cleanup_failures = self.cleaner.cleanup(self.budgets.cleanup).await;
        if !cleanup_failures.is_empty() {
            let errors = cleanup_failures
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            tracing::warn!(
                failed = cleanup_failures.len(),
                cleanup_timeout_ms = self.budgets.cleanup.as_millis() as u64,
                errors = %errors,
                "Errors occurred during resource cleanup"
            );
        }
        metrics::record_phase_duration(Phase::CleaningUp.as_str(), cleanup_started.elapsed());

        self.enter(Phase::Done);
        let elapsed = started.elapsed();
        tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "Server has exited");

        Ok(ShutdownReport {
            signal,
            drained,
            cleanup_failures,
            elapsed,
        })
    }

    fn enter(&self, phase: Phase) {
        self.phase.send_replace(phase);
        metrics::record_phase(phase.as_str(), phase.ordinal());
        tracing::debug!(phase = %phase, "Lifecycle phase changed");
    }
}

/// One-shot notification that the shutdown sequence has ended.
#[must_use = "the process should wait for shutdown to complete"]
#[derive(Debug)]
pub struct Completion {
    rx: oneshot::Receiver<Result<ShutdownReport, ShutdownError>>,
}

impl Completion {
    /// Wait for the sequence to finish.
    pub async fn wait(self) -> Result<ShutdownReport, ShutdownError> {
        self.rx.await.unwrap_or(Err(ShutdownError::Abandoned))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_are_ordered() {
        assert!(Phase::Running < Phase::ShuttingDown);
        assert!(Phase::ShuttingDown < Phase::CleaningUp);
        assert!(Phase::CleaningUp < Phase::Done);
        assert_eq!(Phase::Done.ordinal(), 3);
    }

    #[tokio::test]
    async fn dropped_sequencer_is_abandoned_not_a_drain_failure() {
        let (tx, rx) = oneshot::channel();
        drop(tx);

        match (Completion { rx }).wait().await {
            Err(ShutdownError::Abandoned) => {}
            other => panic!("expected abandoned, got {other:?}"),
        }
    }

    #[test]
    fn abort_is_the_default_policy() {
        assert_eq!(DrainTimeoutPolicy::default(), DrainTimeoutPolicy::Abort);
    }
}
