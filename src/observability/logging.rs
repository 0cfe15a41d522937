//! Structured logging.
//!
//! # Responsibilities
//! - Install the global `tracing` subscriber
//! - Honour `RUST_LOG`, falling back to the configured level
//! - Attach the OpenTelemetry layer when span export is configured

use opentelemetry::trace::TracerProvider as _;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;
use crate::observability::telemetry::{build_tracer_provider, Telemetry, TelemetryError};

/// Install the global subscriber.
///
/// Returns the [`Telemetry`] handle whose `shutdown` flushes exported spans.
/// Can only succeed once per process.
pub fn init_logging(config: &ObservabilityConfig) -> Result<Telemetry, TelemetryError> {
    let tracer_provider = match config.otlp_endpoint.as_deref() {
        Some(endpoint) => Some(build_tracer_provider(endpoint)?),
        None => None,
    };

    let otel_layer = tracer_provider.as_ref().map(|provider| {
        tracing_opentelemetry::layer().with_tracer(provider.tracer(env!("CARGO_PKG_NAME")))
    });

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(otel_layer)
        .try_init()?;

    match config.otlp_endpoint.as_deref() {
        Some(endpoint) => tracing::info!(endpoint = %endpoint, "OpenTelemetry span export enabled"),
        None => tracing::info!("OpenTelemetry is not enabled"),
    }

    Ok(Telemetry::new(tracer_provider))
}
