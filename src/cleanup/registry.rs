//! Registry of named cleanup actions.
//!
//! # Responsibilities
//! - Accept registrations from any init path, concurrently
//! - Run every registered action exactly once at shutdown
//! - Bound the whole run by a single deadline
//! - Aggregate failures in registration order
//!
//! # Design Decisions
//! - Actions run one at a time, in registration order
//! - An action still running at the deadline is detached, not aborted; the
//!   remaining actions are then started without being awaited
//! - Duplicate names are accepted and flagged as ambiguous

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinError;
use tokio::time::{timeout_at, Instant};
use tracing::Instrument;

use crate::cleanup::action::{BoxError, CleanupAction, CleanupFailure, FailureReason, RegistryClosed};
use crate::observability::metrics;

/// Roughly thirty years.
const FAR_FUTURE_SECS: u64 = 86_400 * 365 * 30;

#[derive(Debug, Default)]
struct Registry {
    actions: Vec<CleanupAction>,
    consumed: bool,
}

impl Registry {
    fn push(&mut self, action: CleanupAction) -> Result<(), RegistryClosed> {
        if self.consumed {
            tracing::error!(action = %action.name(), "Registration after cleanup was rejected");
            return Err(RegistryClosed {
                name: action.name().to_string(),
            });
        }

        if self.actions.iter().any(|a| a.name() == action.name()) {
            tracing::warn!(
                action = %action.name(),
                "Cleanup action registered under a duplicate name, diagnostics will be ambiguous"
            );
        }

        tracing::debug!(
            action = %action.name(),
            position = self.actions.len(),
            "Cleanup action registered"
        );
        self.actions.push(action);
        Ok(())
    }
}

/// Process-wide registry of teardown actions.
///
/// Constructed once at startup and shared as `Arc<ResourceCleaner>` with every
/// component that registers or triggers cleanup.
#[derive(Debug, Default)]
pub struct ResourceCleaner {
    inner: Mutex<Registry>,
}

impl ResourceCleaner {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named cleanup action.
    ///
    /// Names need not be unique. Fails only if [`cleanup`](Self::cleanup) has
    /// already consumed the registry.
    pub fn register_with_name<F, Fut, E>(
        &self,
        name: impl Into<String>,
        action: F,
    ) -> Result<(), RegistryClosed>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError>,
    {
        self.lock().push(CleanupAction::new(name, action))
    }

    /// Register an action under a generated `resource-<n>` name.
    pub fn register<F, Fut, E>(&self, action: F) -> Result<(), RegistryClosed>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError>,
    {
        let mut registry = self.lock();
        let name = format!("resource-{}", registry.actions.len() + 1);
        registry.push(CleanupAction::new(name, action))
    }

    /// Number of actions waiting to run.
    pub fn len(&self) -> usize {
        self.lock().actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.lock()
            .actions
            .iter()
            .map(|a| a.name().to_string())
            .collect()
    }

    /// Run every registered action, waiting at most `timeout` overall.
    ///
    /// Each action is awaited before the next one starts. Returns the failed
    /// actions in registration order; an empty vector means
    /// every action succeeded. The registry is single-use: a second call logs a
    /// warning and returns an empty vector without running anything.
    pub async fn cleanup(&self, timeout: Duration) -> Vec<CleanupFailure> {
        let actions = {
            let mut registry = self.lock();
            if registry.consumed {
                tracing::warn!("Cleanup already ran, ignoring repeated call");
                return Vec::new();
            }
            registry.consumed = true;
            std::mem::take(&mut registry.actions)
        };

        let deadline = deadline_after(timeout);
        tracing::info!(
            actions = actions.len(),
            timeout_ms = timeout.as_millis() as u64,
            "Cleaning up resources"
        );

        let mut name_counts: HashMap<String, usize> = HashMap::new();
        for action in &actions {
            *name_counts.entry(action.name().to_string()).or_default() += 1;
        }

        let mut failures = Vec::new();
        for action in actions {
            let (name, fut) = action.into_parts();
            let span = tracing::info_span!("cleanup", action = %name);
            let handle = tokio::spawn(fut.instrument(span));

            // Past the deadline the action is still started, just not awaited.
            let reason = if Instant::now() >= deadline {
                FailureReason::TimedOut
            } else {
                match timeout_at(deadline, handle).await {
                    Ok(Ok(Ok(()))) => {
                        tracing::debug!(action = %name, "Resource released");
                        continue;
                    }
                    Ok(Ok(Err(e))) => FailureReason::Failed(e),
                    Ok(Err(e)) => FailureReason::Panicked(join_error_message(e)),
                    Err(_) => FailureReason::TimedOut,
                }
            };

            let ambiguous = name_counts.get(&name).is_some_and(|count| *count > 1);
            tracing::warn!(action = %name, error = %reason, ambiguous, "Resource cleanup failed");
            metrics::record_cleanup_failure(&name);
            failures.push(CleanupFailure {
                name,
                reason,
                ambiguous,
            });
        }

        failures
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// `now + timeout`, saturating to a far-future instant for huge timeouts.
fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .unwrap_or_else(|| now + Duration::from_secs(FAR_FUTURE_SECS))
}

fn join_error_message(err: JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload: Box<dyn Any + Send> = err.into_panic();
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
