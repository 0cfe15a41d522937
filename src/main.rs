//! Server lifecycle controller
//!
//! Serves HTTP until SIGINT, SIGTERM or SIGHUP arrives, then shuts down in
//! order: stop accepting, drain in-flight requests within the shutdown
//! timeout, run registered cleanup actions within the cleanup timeout, exit.
//!
//! # Exit Status
//! - 0: shutdown completed (cleanup failures are logged, not fatal)
//! - 1: configuration or bind failure, or the drain timed out under the
//!   `abort` drain timeout policy

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;

use server_lifecycle::config::load_config;
use server_lifecycle::http::default_routes;
use server_lifecycle::lifecycle::{Bootstrap, BootstrapError, OsSignals, ShutdownError};
use server_lifecycle::observability::{init_logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "server-lifecycle")]
#[command(about = "HTTP server with ordered, timeout-bounded graceful shutdown")]
struct Cli {
    /// Path to the TOML configuration file; defaults apply when omitted
    #[arg(long, short, env = "CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let telemetry = init_logging(&config.observability)?;

    tracing::info!("server-lifecycle v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.server.bind_address(),
        shutdown_timeout_secs = config.server.shutdown_timeout().as_secs(),
        cleanup_timeout_secs = config.server.cleanup_timeout().as_secs(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    // Armed before the listener exists so early signals are latched.
    let signals = OsSignals::arm()?;

    let bootstrap = Bootstrap::new(config.server, default_routes()).with_telemetry(telemetry);
    match bootstrap.run(signals).await {
        Ok(report) => {
            tracing::info!(
                signal = %report.signal,
                drained = report.drained,
                cleanup_failures = report.cleanup_failures.len(),
                "Shutdown complete"
            );
            Ok(())
        }
        Err(BootstrapError::Shutdown(ShutdownError::Drain(e))) => {
            tracing::error!(error = %e, "Drain timed out, terminating without resource cleanup");
            process::exit(1)
        }
        Err(BootstrapError::Shutdown(ShutdownError::Abandoned)) => {
            tracing::error!("Shutdown sequencer stopped before completing, cleanup state unknown");
            process::exit(1)
        }
        Err(e) => Err(e.into()),
    }
}
