//! Resource cleanup subsystem.
//!
//! # Data Flow
//! ```text
//! Bootstrap / any init path
//!     → registry.rs (register_with_name, concurrent append)
//!
//! Shutdown sequencer (CleaningUp phase):
//!     → registry.rs (cleanup: take all actions, start them in order)
//!     → action.rs (each action runs on its own task)
//!     → Vec<CleanupFailure> in registration order
//! ```
//!
//! # Design Decisions
//! - One registry per process, passed explicitly as `Arc<ResourceCleaner>`
//! - An action that fails or hangs never blocks the others
//! - The registry is consumed exactly once; later registrations are rejected

pub mod action;
pub mod registry;

pub use action::{BoxError, CleanupAction, CleanupFailure, FailureReason, RegistryClosed};
pub use registry::ResourceCleaner;
