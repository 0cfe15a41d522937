//! Cleanup actions and their failure records.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::fmt;
use std::future::Future;

/// Opaque error type returned by collaborator-provided actions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

type ActionFn = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), BoxError>> + Send>;

/// A named, zero-argument teardown operation.
pub struct CleanupAction {
    name: String,
    action: ActionFn,
}

impl CleanupAction {
    /// Wrap an async closure as a cleanup action.
    pub fn new<F, Fut, E>(name: impl Into<String>, action: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError>,
    {
        Self {
            name: name.into(),
            action: Box::new(move || action().map(|res| res.map_err(Into::<BoxError>::into)).boxed()),
        }
    }

    /// Name used for diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Split into the name and a future that invokes the action when first polled.
    pub(crate) fn into_parts(
        self,
    ) -> (String, impl Future<Output = Result<(), BoxError>> + Send + 'static) {
        let action = self.action;
        (self.name, async move { action().await })
    }
}

impl fmt::Debug for CleanupAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CleanupAction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Why a cleanup action did not complete successfully.
#[derive(Debug, thiserror::Error)]
pub enum FailureReason {
    /// The action ran to completion and reported an error.
    #[error("{0}")]
    Failed(BoxError),

    /// The cleanup deadline elapsed while the action was still running.
    #[error("did not finish before the cleanup deadline")]
    TimedOut,

    /// The action panicked.
    #[error("panicked: {0}")]
    Panicked(String),
}

/// A failed cleanup action, identified by its registered name.
#[derive(Debug)]
pub struct CleanupFailure {
    pub name: String,
    pub reason: FailureReason,
    /// More than one action was registered under `name`.
    pub ambiguous: bool,
}

impl fmt::Display for CleanupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ambiguous {
            write!(f, "{} (ambiguous name): {}", self.name, self.reason)
        } else {
            write!(f, "{}: {}", self.name, self.reason)
        }
    }
}

impl std::error::Error for CleanupFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.reason)
    }
}

/// Returned when registering after the registry has been consumed.
#[derive(Debug, thiserror::Error)]
#[error("cleanup registry already consumed, action {name:?} will never run")]
pub struct RegistryClosed {
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn action_error_is_boxed() {
        let action = CleanupAction::new("disk", || async {
            Err::<(), _>(std::io::Error::new(std::io::ErrorKind::Other, "disk busy"))
        });
        assert_eq!(action.name(), "disk");

        let (name, fut) = action.into_parts();
        let err = fut.await.unwrap_err();
        assert_eq!(name, "disk");
        assert_eq!(err.to_string(), "disk busy");
    }

    #[test]
    fn failure_display_flags_ambiguous_names() {
        let failure = CleanupFailure {
            name: "db".into(),
            reason: FailureReason::TimedOut,
            ambiguous: true,
        };
        assert_eq!(
            failure.to_string(),
            "db (ambiguous name): did not finish before the cleanup deadline"
        );
    }
}
