//! Startup orchestration.
//!
//! # Responsibilities
//! - Register process-level cleanup actions (span export flush)
//! - Run best-effort initialization (data seeding)
//! - Bind the listener and begin accepting traffic
//! - Hand control to the shutdown sequencer and wait for it
//!
//! # Design Decisions
//! - Bind failure is fatal and happens before the sequencer exists, so no
//!   cleanup runs for it
//! - Seeding failures are logged and ignored
//! - Listeners start last (traffic only when ready)

use axum::Router;
use futures_util::future::BoxFuture;
use std::sync::Arc;

use crate::cleanup::{BoxError, RegistryClosed, ResourceCleaner};
use crate::config::ServerConfig;
use crate::http::{HttpServer, StartError};
use crate::lifecycle::shutdown::{ShutdownError, ShutdownReport, ShutdownSequencer};
use crate::lifecycle::signals::SignalSource;
use crate::observability::Telemetry;

/// Name under which the span exporter flush is registered.
pub const TRACER_CLEANUP: &str = "tracer";

/// Best-effort initialization run before serving begins.
pub trait DataSeeder: Send + Sync {
    fn seed(&self) -> BoxFuture<'_, Result<(), BoxError>>;
}

/// Errors that end [`Bootstrap::run`].
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("Failed to start server: {0}")]
    Start(#[from] StartError),

    #[error("Failed to register cleanup action: {0}")]
    Registration(#[from] RegistryClosed),

    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
}

/// Composes the server, its cleanup actions and the shutdown sequencer.
pub struct Bootstrap {
    config: ServerConfig,
    router: Router,
    cleaner: Arc<ResourceCleaner>,
    telemetry: Option<Telemetry>,
    seeder: Option<Box<dyn DataSeeder>>,
}

impl Bootstrap {
    pub fn new(config: ServerConfig, router: Router) -> Self {
        Self {
            config,
            router,
            cleaner: Arc::new(ResourceCleaner::new()),
            telemetry: None,
            seeder: None,
        }
    }

    /// Use an existing registry instead of a fresh one.
    pub fn with_cleaner(mut self, cleaner: Arc<ResourceCleaner>) -> Self {
        self.cleaner = cleaner;
        self
    }

    /// Flush this telemetry pipeline during cleanup.
    pub fn with_telemetry(mut self, telemetry: Telemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn with_seeder(mut self, seeder: impl DataSeeder + 'static) -> Self {
        self.seeder = Some(Box::new(seeder));
        self
    }

    /// The registry other components should register their actions with.
    pub fn cleaner(&self) -> Arc<ResourceCleaner> {
        Arc::clone(&self.cleaner)
    }

    /// Start serving and block until shutdown completes.
    ///
    /// `signals` should be armed by the caller before this is called.
    pub async fn run<S: SignalSource>(self, signals: S) -> Result<ShutdownReport, BootstrapError> {
        let Self {
            config,
            router,
            cleaner,
            telemetry,
            seeder,
        } = self;

        if let Some(telemetry) = telemetry {
            cleaner.register_with_name(TRACER_CLEANUP, move || telemetry.shutdown())?;
        }

        if let Some(seeder) = seeder {
            match seeder.seed().await {
                Ok(()) => tracing::info!("Seed data initialized"),
                Err(e) => tracing::warn!(error = %e, "Failed to initialize seed data"),
            }
        }

        let server = HttpServer::new(router, &config)
            .start(config.bind_address())
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Server failed to start"))?;

        tracing::info!(
            shutdown_timeout_ms = config.shutdown_timeout().as_millis() as u64,
            cleanup_timeout_ms = config.cleanup_timeout().as_millis() as u64,
            drain_timeout_policy = ?config.drain_timeout_policy,
            cleanup_actions = cleaner.len(),
            "Shutdown sequencer armed"
        );

        let completion = ShutdownSequencer::new(signals, cleaner, config.budgets())
            .with_drain_timeout_policy(config.drain_timeout_policy)
            .spawn(server);

        Ok(completion.wait().await?)
    }
}
