//! Core abstractions for the stale-while-revalidate cache coordinator.
//!
//! This crate provides the fundamental types:
//! - `RequestIdentity` - Path + ordered query parameters used for key derivation
//! - `ComputeScope` - Execution context threaded into compute functions
//! - `CoordinatorConfig` - Runtime configuration with serde support

mod config;
mod context;

pub use config::*;
pub use context::*;
