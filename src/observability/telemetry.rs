//! OpenTelemetry span export.
//!
//! # Responsibilities
//! - Build the OTLP tracer provider
//! - Flush and shut the provider down when asked, as a cleanup action

use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::error::OTelSdkError;
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;

/// Errors raised while setting up or tearing down telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("Failed to install tracing subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),

    #[error("Failed to build OTLP span exporter: {0}")]
    Exporter(#[from] opentelemetry_otlp::ExporterBuildError),

    #[error("Failed to shut down tracer provider: {0}")]
    Shutdown(#[from] OTelSdkError),

    #[error("Tracer shutdown task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Handle to the span export pipeline.
///
/// Holds nothing when export is disabled; `shutdown` is then a no-op.
#[derive(Debug, Default)]
pub struct Telemetry {
    tracer_provider: Option<SdkTracerProvider>,
}

impl Telemetry {
    pub(crate) fn new(tracer_provider: Option<SdkTracerProvider>) -> Self {
        Self { tracer_provider }
    }

    /// A handle with no exporter attached.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Whether spans are being exported.
    pub fn is_exporting(&self) -> bool {
        self.tracer_provider.is_some()
    }

    /// Flush pending spans and shut the exporter down.
    pub async fn shutdown(self) -> Result<(), TelemetryError> {
        let Some(provider) = self.tracer_provider else {
            return Ok(());
        };
        // SdkTracerProvider::shutdown blocks until the batch processor drains.
        tokio::task::spawn_blocking(move || provider.shutdown()).await??;
        tracing::debug!("Tracer provider shut down");
        Ok(())
    }
}

/// Build a tracer provider exporting over OTLP/gRPC to `endpoint`.
pub(crate) fn build_tracer_provider(endpoint: &str) -> Result<SdkTracerProvider, TelemetryError> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let resource = Resource::builder()
        .with_service_name(env!("CARGO_PKG_NAME"))
        .build();

    Ok(SdkTracerProvider::builder()
        .with_resource(resource)
        .with_batch_exporter(exporter)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_shutdown_is_noop() {
        let telemetry = Telemetry::disabled();
        assert!(!telemetry.is_exporting());
        telemetry.shutdown().await.unwrap();
    }
}
