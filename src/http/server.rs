//! HTTP server lifecycle.
//!
//! # Responsibilities
//! - Wrap the application router with request id, tracing, timeout and
//!   in-flight tracking middleware
//! - Bind the listener and run the serve loop on its own task
//! - Stop accepting on request and drain in-flight requests within a deadline
//!
//! # Design Decisions
//! - `start` returns as soon as the socket is bound; bind failure is fatal
//! - The drain deadline is passed per call, never shared with cleanup
//! - A drain that misses its deadline aborts the serve task

use axum::http::HeaderName;
use axum::{middleware, Router};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::http::inflight::{track_in_flight, InFlightTracker};
use crate::observability::metrics;

const X_REQUEST_ID: &str = "x-request-id";

/// Startup-fatal server errors.
#[derive(Debug, thiserror::Error)]
pub enum StartError {
    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
}

/// Errors raised while draining the server.
#[derive(Debug, thiserror::Error)]
pub enum DrainError {
    #[error("{in_flight} in-flight request(s) still running after the {timeout:?} shutdown timeout")]
    DeadlineExceeded { timeout: Duration, in_flight: u64 },

    #[error("Serve loop failed: {0}")]
    Serve(#[source] std::io::Error),

    #[error("Serve task failed: {0}")]
    Task(#[source] JoinError),
}

/// HTTP server for an opaque application router.
pub struct HttpServer {
    router: Router,
    tracker: InFlightTracker,
}

impl HttpServer {
    /// Create a server dispatching to `handler`.
    pub fn new(handler: Router, config: &ServerConfig) -> Self {
        let tracker = InFlightTracker::new();
        let router = Self::build_router(handler, config, tracker.clone());
        Self { router, tracker }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(handler: Router, config: &ServerConfig, tracker: InFlightTracker) -> Router {
        let x_request_id = HeaderName::from_static(X_REQUEST_ID);
        handler
            .layer(middleware::from_fn_with_state(tracker, track_in_flight))
            .layer(TimeoutLayer::new(config.request_timeout()))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(x_request_id)),
            )
    }

    /// Bind `addr` and start serving on a background task.
    ///
    /// Returns once the listener is bound.
    pub async fn start(self, addr: SocketAddr) -> Result<ServerHandle, StartError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| StartError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| StartError::Bind { addr, source })?;

        let token = CancellationToken::new();
        let stop_accepting = token.clone();
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { stop_accepting.cancelled().await })
                .await
        });

        tracing::info!(address = %local_addr, "Server is running");

        Ok(ServerHandle {
            local_addr,
            token,
            task,
            tracker: self.tracker,
        })
    }
}

/// A running server.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    token: CancellationToken,
    task: JoinHandle<std::io::Result<()>>,
    tracker: InFlightTracker,
}

impl ServerHandle {
    /// The address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Requests currently being handled.
    pub fn in_flight(&self) -> u64 {
        self.tracker.active_count()
    }

    /// Stop accepting connections and wait for in-flight requests.
    ///
    /// Fails with [`DrainError::DeadlineExceeded`] if requests are still
    /// running after `timeout`; the serve task is aborted in that case.
    pub async fn shutdown(mut self, timeout: Duration) -> Result<(), DrainError> {
        tracing::info!(
            address = %self.local_addr,
            in_flight = self.tracker.active_count(),
            timeout_ms = timeout.as_millis() as u64,
            "Stopped accepting connections, draining in-flight requests"
        );
        self.token.cancel();

        match tokio::time::timeout(timeout, &mut self.task).await {
            Ok(joined) => serve_outcome(joined),
            Err(_) => {
                let in_flight = self.tracker.active_count();
                metrics::record_in_flight(in_flight);
                self.task.abort();
                Err(DrainError::DeadlineExceeded { timeout, in_flight })
            }
        }
    }
}

/// Map how the serve task ended onto the drain result.
fn serve_outcome(joined: Result<std::io::Result<()>, JoinError>) -> Result<(), DrainError> {
    match joined {
        Ok(Ok(())) => {
            tracing::info!("HTTP server stopped");
            Ok(())
        }
        Ok(Err(e)) => Err(DrainError::Serve(e)),
        Err(e) => Err(DrainError::Task(e)),
    }
}
