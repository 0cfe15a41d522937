//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::lifecycle::shutdown::{DrainTimeoutPolicy, ShutdownBudgets};

/// Fallback for both shutdown budgets when unset or zero.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener and shutdown settings.
    pub server: ServerConfig,

    /// Logging, metrics and span export.
    pub observability: ObservabilityConfig,
}

/// Listener and shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host.
    pub host: IpAddr,

    /// Bind port (0 picks an ephemeral port).
    pub port: u16,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Budget for draining in-flight requests, in seconds.
    pub shutdown_timeout_secs: u64,

    /// Budget for running cleanup actions, in seconds.
    pub cleanup_timeout_secs: u64,

    /// What to do when the drain budget runs out.
    pub drain_timeout_policy: DrainTimeoutPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
            request_timeout_secs: 30,
            shutdown_timeout_secs: DEFAULT_TIMEOUT_SECS,
            cleanup_timeout_secs: DEFAULT_TIMEOUT_SECS,
            drain_timeout_policy: DrainTimeoutPolicy::default(),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Drain budget; zero means "use the default".
    pub fn shutdown_timeout(&self) -> Duration {
        secs_or_default(self.shutdown_timeout_secs)
    }

    /// Cleanup budget; zero means "use the default".
    pub fn cleanup_timeout(&self) -> Duration {
        secs_or_default(self.cleanup_timeout_secs)
    }

    pub fn budgets(&self) -> ShutdownBudgets {
        ShutdownBudgets {
            shutdown: self.shutdown_timeout(),
            cleanup: self.cleanup_timeout(),
        }
    }
}

fn secs_or_default(secs: u64) -> Duration {
    match secs {
        0 => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        secs => Duration::from_secs(secs),
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,

    /// OTLP/gRPC collector endpoint; span export is off when unset.
    pub otlp_endpoint: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
            otlp_endpoint: None,
        }
    }
}
