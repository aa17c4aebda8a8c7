//! Cache storage backend abstraction.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::entry::CacheEntry;
use crate::error::CacheResult;

/// Storage backend consumed by the coordinator.
///
/// Implementations must tolerate concurrent get/set/delete from readers and
/// background workers. `try_lock` must be an atomic set-if-absent: it is the
/// sole mutual-exclusion primitive guarding refresh dispatch, so a backend
/// that cannot make the presence-check-and-create atomic must serialize it
/// internally.
#[async_trait]
pub trait CacheStore<V>: Send + Sync
where
    V: Clone + Send + Sync + 'static,
{
    /// Get the entry stored under `key`.
    async fn get(&self, key: &str) -> CacheResult<Option<CacheEntry<V>>>;

    /// Store an entry under `key`, with an optional store-level expiry.
    async fn set(&self, key: &str, entry: CacheEntry<V>, ttl: Option<Duration>)
        -> CacheResult<()>;

    /// Delete the entry under `key`.
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Atomically create a refresh lock under `key` unless one exists.
    ///
    /// The lock expires after `ttl` even if never released, so a crashed
    /// worker cannot block refreshes for its key indefinitely. Returns true
    /// if the lock was created by this call.
    async fn try_lock(&self, key: &str, ttl: Duration) -> CacheResult<bool>;

    /// Release a refresh lock. Releasing an absent lock is a no-op.
    async fn unlock(&self, key: &str) -> CacheResult<()>;
}

struct Stored<V> {
    entry: CacheEntry<V>,
    expires_at: Option<Instant>,
}

impl<V> Stored<V> {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// Thread-safe in-memory store backend.
///
/// Entries expire lazily on read. Lock flags live under their own mutex so
/// the presence check and create in `try_lock` are a single atomic step.
pub struct MemoryStore<V> {
    entries: RwLock<HashMap<String, Stored<V>>>,
    locks: Mutex<HashMap<String, Instant>>,
}

impl<V> MemoryStore<V> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn locks(&self) -> std::sync::MutexGuard<'_, HashMap<String, Instant>> {
        match self.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<V> Default for MemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V> CacheStore<V> for MemoryStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> CacheResult<Option<CacheEntry<V>>> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(stored) if !stored.is_expired() => return Ok(Some(stored.entry.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired: drop it under the write lock, re-checking first.
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|stored| stored.is_expired()) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set(
        &self,
        key: &str,
        entry: CacheEntry<V>,
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        let stored = Stored {
            entry,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.entries.write().await.insert(key.to_string(), stored);
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn try_lock(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
        let mut locks = self.locks();
        let now = Instant::now();
        if locks.get(key).is_some_and(|expires_at| now < *expires_at) {
            return Ok(false);
        }
        locks.insert(key.to_string(), now + ttl);
        Ok(true)
    }

    async fn unlock(&self, key: &str) -> CacheResult<()> {
        self.locks().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_then_get() {
        let store = MemoryStore::new();
        store
            .set("k", CacheEntry::new("v1".to_string()), None)
            .await
            .unwrap();
        let entry = store.get("k").await.unwrap().unwrap();
        assert_eq!(entry.data, "v1");
    }

    #[tokio::test]
    async fn test_get_absent() {
        let store: MemoryStore<String> = MemoryStore::new();
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_removes_entry() {
        let store = MemoryStore::new();
        store
            .set("k", CacheEntry::new(1u64), None)
            .await
            .unwrap();
        store.delete("k").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_entry_ttl_expires() {
        let store = MemoryStore::new();
        store
            .set("k", CacheEntry::new(1u64), Some(Duration::from_millis(10)))
            .await
            .unwrap();
        assert!(store.get("k").await.unwrap().is_some());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_try_lock_is_exclusive() {
        let store: MemoryStore<String> = MemoryStore::new();
        assert!(store.try_lock("k", Duration::from_secs(10)).await.unwrap());
        assert!(!store.try_lock("k", Duration::from_secs(10)).await.unwrap());
    }

    #[tokio::test]
    async fn test_unlock_releases() {
        let store: MemoryStore<String> = MemoryStore::new();
        assert!(store.try_lock("k", Duration::from_secs(10)).await.unwrap());
        store.unlock("k").await.unwrap();
        assert!(store.try_lock("k", Duration::from_secs(10)).await.unwrap());
    }

    #[tokio::test]
    async fn test_lock_ttl_self_heals() {
        let store: MemoryStore<String> = MemoryStore::new();
        assert!(store
            .try_lock("k", Duration::from_millis(10))
            .await
            .unwrap());
        tokio::time::sleep(Duration::from_millis(20)).await;
        // Never unlocked, but the TTL has passed.
        assert!(store.try_lock("k", Duration::from_secs(10)).await.unwrap());
    }

    #[tokio::test]
    async fn test_zero_ttl_lock_expires_immediately() {
        let store: MemoryStore<String> = MemoryStore::new();
        assert!(store.try_lock("k", Duration::ZERO).await.unwrap());
        assert!(store.try_lock("k", Duration::ZERO).await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_lock_single_winner() {
        let store: std::sync::Arc<MemoryStore<String>> = std::sync::Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.try_lock("k", Duration::from_secs(10)).await.unwrap()
            }));
        }
        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
