//! HTTP serving subsystem.
//!
//! # Data Flow
//! ```text
//! TcpListener (bound in server.rs)
//!     → request id, trace, timeout layers
//!     → inflight.rs (count requests in handlers)
//!     → opaque application Router
//!
//! On shutdown:
//!     cancel token → stop accept → drain connections (bounded) → task exits
//! ```

pub mod inflight;
pub mod routes;
pub mod server;

pub use inflight::InFlightTracker;
pub use routes::default_routes;
pub use server::{DrainError, HttpServer, ServerHandle, StartError};
