//! Background refresh execution.
//!
//! This crate provides:
//! - `WorkerPool` - Bounded fire-and-forget executor for refresh jobs
//! - `PeriodicScheduler` - Recurring per-key refresh jobs on a fixed interval
//!
//! Both are explicitly constructed, owned instances with explicit shutdown;
//! nothing here relies on ambient global state.

mod pool;
mod scheduler;

pub use pool::*;
pub use scheduler::*;
