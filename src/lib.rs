//! Server lifecycle controller library.

pub mod cleanup;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use cleanup::ResourceCleaner;
pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::{Bootstrap, ShutdownSequencer};
