//! Shutdown signal sources.
//!
//! # Responsibilities
//! - Register OS signal handlers (SIGINT, SIGTERM, SIGHUP)
//! - Provide a synthetic source for tests and embedding
//! - Report which signal fired
//!
//! # Design Decisions
//! - Sources latch deliveries made before anyone waits on them
//! - SIGHUP shuts down like the others; there is no reload path
//! - Repeated signals are not escalated to a hard kill

use std::fmt;
use std::future::{pending, Future};
use tokio::sync::mpsc;

/// The event that triggered a shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
    Hangup,
    /// Raised through a [`ShutdownTrigger`].
    Synthetic,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShutdownSignal::Interrupt => "SIGINT",
            ShutdownSignal::Terminate => "SIGTERM",
            ShutdownSignal::Hangup => "SIGHUP",
            ShutdownSignal::Synthetic => "synthetic",
        };
        f.write_str(name)
    }
}

/// A source of termination requests.
pub trait SignalSource: Send + 'static {
    /// Wait for the next termination request.
    fn wait(&mut self) -> impl Future<Output = ShutdownSignal> + Send;
}

/// OS signal handlers, installed when armed.
#[cfg(unix)]
#[derive(Debug)]
pub struct OsSignals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
    hangup: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl OsSignals {
    /// Install handlers for SIGINT, SIGTERM and SIGHUP.
    ///
    /// Signals delivered after this returns are buffered until `wait` is polled.
    pub fn arm() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
            hangup: signal(SignalKind::hangup())?,
        })
    }
}

#[cfg(unix)]
impl SignalSource for OsSignals {
    fn wait(&mut self) -> impl Future<Output = ShutdownSignal> + Send {
        async move {
            tokio::select! {
                Some(()) = self.interrupt.recv() => ShutdownSignal::Interrupt,
                Some(()) = self.terminate.recv() => ShutdownSignal::Terminate,
                Some(()) = self.hangup.recv() => ShutdownSignal::Hangup,
                else => pending().await,
            }
        }
    }
}

/// Ctrl-C handler for platforms without Unix signals.
#[cfg(not(unix))]
#[derive(Debug)]
pub struct OsSignals {
    _private: (),
}

#[cfg(not(unix))]
impl OsSignals {
    pub fn arm() -> std::io::Result<Self> {
        Ok(Self { _private: () })
    }
}

#[cfg(not(unix))]
impl SignalSource for OsSignals {
    fn wait(&mut self) -> impl Future<Output = ShutdownSignal> + Send {
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => ShutdownSignal::Interrupt,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                    pending().await
                }
            }
        }
    }
}

/// Create a synthetic signal source and the trigger that drives it.
pub fn manual() -> (ShutdownTrigger, ManualSignals) {
    let (tx, rx) = mpsc::channel(1);
    (ShutdownTrigger { tx }, ManualSignals { rx })
}

/// Raises synthetic shutdown requests.
#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
    tx: mpsc::Sender<ShutdownSignal>,
}

impl ShutdownTrigger {
    /// Request a shutdown.
    ///
    /// Returns `false` if a request is already pending or the source is gone.
    pub fn trigger(&self, signal: ShutdownSignal) -> bool {
        self.tx.try_send(signal).is_ok()
    }
}

/// Receiving end of [`manual`].
#[derive(Debug)]
pub struct ManualSignals {
    rx: mpsc::Receiver<ShutdownSignal>,
}

impl SignalSource for ManualSignals {
    fn wait(&mut self) -> impl Future<Output = ShutdownSignal> + Send {
        async move {
            match self.rx.recv().await {
                Some(signal) => signal,
                // Every trigger dropped: nobody can ask for shutdown anymore.
                None => pending().await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn manual_signal_is_latched_before_wait() {
        let (trigger, mut signals) = manual();
        assert!(trigger.trigger(ShutdownSignal::Terminate));
        assert!(!trigger.trigger(ShutdownSignal::Interrupt));

        let signal = tokio::time::timeout(Duration::from_secs(1), signals.wait())
            .await
            .unwrap();
        assert_eq!(signal, ShutdownSignal::Terminate);
    }

    #[tokio::test]
    async fn dropped_trigger_never_fires() {
        let (trigger, mut signals) = manual();
        drop(trigger);

        let waited = tokio::time::timeout(Duration::from_millis(50), signals.wait()).await;
        assert!(waited.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn os_hangup_is_reported() {
        let mut signals = OsSignals::arm().unwrap();

        let status = std::process::Command::new("kill")
            .args(["-HUP", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        let signal = tokio::time::timeout(Duration::from_secs(5), signals.wait())
            .await
            .unwrap();
        assert_eq!(signal, ShutdownSignal::Hangup);
    }

    #[test]
    fn signal_names() {
        assert_eq!(ShutdownSignal::Interrupt.to_string(), "SIGINT");
        assert_eq!(ShutdownSignal::Synthetic.to_string(), "synthetic");
    }
}
