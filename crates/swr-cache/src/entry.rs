//! Cached entry model.

use serde::{Deserialize, Serialize};

/// A cached value with its creation time.
///
/// Entries are created or overwritten only by a completed computation; a
/// reader never observes a partially written entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<V> {
    /// The cached value.
    pub data: V,
    /// Creation time in seconds since the Unix epoch.
    pub timestamp: u64,
}

impl<V> CacheEntry<V> {
    /// Create an entry stamped with the current time.
    pub fn new(data: V) -> Self {
        Self {
            data,
            timestamp: now_epoch_secs(),
        }
    }

    /// Create an entry with an explicit timestamp.
    pub fn at(data: V, timestamp: u64) -> Self {
        Self { data, timestamp }
    }

    /// Age of the entry in seconds at `now`.
    pub fn age(&self, now: u64) -> u64 {
        now.saturating_sub(self.timestamp)
    }

    /// Whether the entry is inside the freshness window at `now`.
    ///
    /// The window may be zero or negative (timeout <= refresh_margin), in
    /// which case every entry is stale.
    pub fn is_fresh(&self, window: i64, now: u64) -> bool {
        (now as i64 - self.timestamp as i64) < window
    }
}

/// Current time in seconds since the Unix epoch.
pub fn now_epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
