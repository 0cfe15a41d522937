//! Demonstration request handlers.
//!
//! Stands in for the application router; the lifecycle code treats any
//! `axum::Router` as an opaque dispatch entry point.

use axum::http::{Method, Uri};
use axum::routing::get;
use axum::Router;

/// `/health` plus an echo fallback.
pub fn default_routes() -> Router {
    Router::new().route("/health", get(health)).fallback(echo)
}

async fn health() -> &'static str {
    "ok"
}

async fn echo(method: Method, uri: Uri) -> String {
    format!("{method} {uri}\n")
}
