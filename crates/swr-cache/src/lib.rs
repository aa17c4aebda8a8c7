//! Stale-while-revalidate caching with singleflight refresh locks.
//!
//! This crate provides:
//! - `KeyDeriver` - Cache key derivation from request identity
//! - `CacheStore` trait + `MemoryStore` - Storage backend abstraction
//! - `Coordinator` - Freshness decisions and the refresh lock protocol
//! - `CachedEndpoint` - Registration surface wrapping a compute function
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use swr_cache::{compute_fn, Coordinator, MemoryStore, RevalidatePolicy, SpawnDispatcher};
//! use swr_core::{ComputeScope, CoordinatorConfig, RequestIdentity};
//!
//! let store = Arc::new(MemoryStore::new());
//! let coordinator = Arc::new(Coordinator::new(
//!     store,
//!     Arc::new(SpawnDispatcher),
//!     &CoordinatorConfig::default(),
//! ));
//!
//! // Serve for 20s, refreshing in the background once entries age past 10s.
//! let endpoint = coordinator.cached(
//!     RevalidatePolicy::from_secs(20, 10),
//!     compute_fn(|_scope| async { Ok("positions".to_string()) }),
//! );
//!
//! let resolution = endpoint
//!     .call(&RequestIdentity::new("/delta_positions"), &ComputeScope::new())
//!     .await?;
//! ```

mod coordinator;
mod entry;
mod error;
mod key;
mod store;

pub use coordinator::*;
pub use entry::*;
pub use error::*;
pub use key::*;
pub use store::*;
