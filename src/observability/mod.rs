//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (lifecycle counters, gauges, histograms)
//!     → telemetry.rs (optional OTLP span export)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Prometheus scrape endpoint (optional)
//!     → OTLP collector (optional)
//! ```
//!
//! # Design Decisions
//! - The span exporter is a resource like any other: its flush is registered
//!   with the resource cleaner instead of running in `Drop`
//! - Metrics are no-ops until an exporter is installed, so tests need no setup

pub mod logging;
pub mod metrics;
pub mod telemetry;

pub use logging::init_logging;
pub use telemetry::{Telemetry, TelemetryError};
