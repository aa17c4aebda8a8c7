//! Revalidation coordinator: freshness decisions and the refresh lock
//! protocol.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use swr_core::{ComputeScope, CoordinatorConfig, RequestIdentity};

use crate::entry::{now_epoch_secs, CacheEntry};
use crate::error::{CacheError, CacheResult};
use crate::key::{CacheKey, KeyDeriver};
use crate::store::CacheStore;

/// A compute function producing a fresh value for a key.
///
/// Invoked with the caller's scope on every path: synchronously on a miss,
/// and from a background worker or periodic job otherwise.
pub type ComputeFn<V> =
    Arc<dyn Fn(ComputeScope) -> BoxFuture<'static, anyhow::Result<V>> + Send + Sync>;

/// Wrap an async closure into a [`ComputeFn`].
pub fn compute_fn<V, F, Fut>(f: F) -> ComputeFn<V>
where
    F: Fn(ComputeScope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
{
    Arc::new(move |scope| Box::pin(f(scope)))
}

/// Status of a resolve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Fresh cache hit.
    Hit,
    /// Stale hit (serving while revalidating).
    Stale,
    /// Cache miss, value computed synchronously.
    Miss,
    /// Forced refresh accepted; no data returned.
    Accepted,
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hit => write!(f, "HIT"),
            Self::Stale => write!(f, "STALE"),
            Self::Miss => write!(f, "MISS"),
            Self::Accepted => write!(f, "ACCEPTED"),
        }
    }
}

/// Result of a resolve call with metadata.
#[derive(Debug, Clone)]
pub struct Resolution<V> {
    /// The served value. `None` for forced-refresh acknowledgments.
    pub value: Option<V>,
    /// How the value was obtained.
    pub status: CacheStatus,
}

impl<V> Resolution<V> {
    /// Create a fresh-hit resolution.
    pub fn hit(value: V) -> Self {
        Self {
            value: Some(value),
            status: CacheStatus::Hit,
        }
    }

    /// Create a stale-served resolution.
    pub fn stale(value: V) -> Self {
        Self {
            value: Some(value),
            status: CacheStatus::Stale,
        }
    }

    /// Create a miss-computed resolution.
    pub fn computed(value: V) -> Self {
        Self {
            value: Some(value),
            status: CacheStatus::Miss,
        }
    }

    /// Create a forced-refresh acknowledgment.
    pub fn accepted() -> Self {
        Self {
            value: None,
            status: CacheStatus::Accepted,
        }
    }
}

/// Freshness policy for one cached operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RevalidatePolicy {
    /// Total time a cached entry is considered usable.
    pub timeout: Duration,
    /// Tail of the timeout during which reads serve stale data and trigger
    /// a background refresh. Also the TTL of the refresh lock.
    pub refresh_margin: Duration,
}

impl RevalidatePolicy {
    /// Create a policy.
    pub fn new(timeout: Duration, refresh_margin: Duration) -> Self {
        Self {
            timeout,
            refresh_margin,
        }
    }

    /// Create a policy from whole seconds.
    pub fn from_secs(timeout: u64, refresh_margin: u64) -> Self {
        Self::new(
            Duration::from_secs(timeout),
            Duration::from_secs(refresh_margin),
        )
    }

    /// Freshness window in seconds: `timeout - refresh_margin`.
    ///
    /// Zero or negative means every read after the first is stale.
    pub fn freshness_window(&self) -> i64 {
        self.timeout.as_secs() as i64 - self.refresh_margin.as_secs() as i64
    }
}

/// Dispatches refresh jobs off the calling task.
///
/// Fire-and-forget: no result flows back to the submitter. Returns false
/// when the job was not accepted (queue full or executor shut down).
pub trait RefreshDispatcher: Send + Sync {
    /// Submit a job for background execution.
    fn dispatch(&self, job: BoxFuture<'static, ()>) -> bool;
}

/// Dispatcher that spawns each job directly onto the tokio runtime.
///
/// Unbounded; suitable for development and tests. Production deployments
/// use the bounded worker pool from the runtime crate.
pub struct SpawnDispatcher;

impl RefreshDispatcher for SpawnDispatcher {
    fn dispatch(&self, job: BoxFuture<'static, ()>) -> bool {
        tokio::spawn(job);
        true
    }
}

/// Stale-while-revalidate coordinator over a shared cache store.
///
/// Serves cached values immediately and refreshes them asynchronously once
/// they age past the freshness window, guaranteeing at most one in-flight
/// refresh per key via a time-bounded lock in the store.
pub struct Coordinator<V> {
    store: Arc<dyn CacheStore<V>>,
    dispatcher: Arc<dyn RefreshDispatcher>,
    keys: KeyDeriver,
}

impl<V> Coordinator<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a coordinator over a store and a refresh dispatcher.
    pub fn new(
        store: Arc<dyn CacheStore<V>>,
        dispatcher: Arc<dyn RefreshDispatcher>,
        config: &CoordinatorConfig,
    ) -> Self {
        Self {
            store,
            dispatcher,
            keys: KeyDeriver::from_config(config),
        }
    }

    /// The key deriver this coordinator was configured with.
    pub fn keys(&self) -> &KeyDeriver {
        &self.keys
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn CacheStore<V>> {
        &self.store
    }

    /// Resolve a read against the cache.
    ///
    /// - Forced refresh: dispatch a background refresh unless one is already
    ///   in flight, and return an acknowledgment without data. Never blocks
    ///   on computation.
    /// - Fresh entry: return it, no side effects.
    /// - Stale entry: return it immediately; dispatch at most one refresh.
    /// - Miss: compute synchronously on the calling task. Failure propagates
    ///   and nothing is written.
    pub async fn resolve(
        &self,
        key: &CacheKey,
        policy: &RevalidatePolicy,
        compute: ComputeFn<V>,
        scope: &ComputeScope,
        force_refresh: bool,
    ) -> CacheResult<Resolution<V>> {
        if force_refresh {
            self.begin_refresh(key, policy, compute, scope).await;
            debug!(key = %key, status = %CacheStatus::Accepted, "forced refresh");
            return Ok(Resolution::accepted());
        }

        let entry = match self.store.get(key.as_str()).await {
            Ok(entry) => entry,
            Err(err) => {
                warn!(key = %key, error = %err, "store read failed, treating as miss");
                None
            }
        };

        match entry {
            Some(entry) if entry.is_fresh(policy.freshness_window(), now_epoch_secs()) => {
                debug!(key = %key, status = %CacheStatus::Hit, age = entry.age(now_epoch_secs()), "cache hit");
                Ok(Resolution::hit(entry.data))
            }
            Some(entry) => {
                self.begin_refresh(key, policy, compute, scope).await;
                debug!(key = %key, status = %CacheStatus::Stale, age = entry.age(now_epoch_secs()), "serving stale");
                Ok(Resolution::stale(entry.data))
            }
            None => {
                debug!(key = %key, status = %CacheStatus::Miss, "cache miss, computing");
                let value = (compute)(scope.clone())
                    .await
                    .map_err(CacheError::Compute)?;
                if let Err(err) = self
                    .store
                    .set(key.as_str(), CacheEntry::new(value.clone()), None)
                    .await
                {
                    warn!(key = %key, error = %err, "miss-path store write failed");
                }
                // A lock left behind by a crashed refresh would otherwise
                // suppress revalidation until its TTL runs out.
                if let Err(err) = self.store.unlock(&key.refresh_marker()).await {
                    warn!(key = %key, error = %err, "failed to clear dangling refresh lock");
                }
                Ok(Resolution::computed(value))
            }
        }
    }

    /// Run the refresh path immediately in the calling task.
    ///
    /// Used by periodic jobs, which refresh unconditionally and take no
    /// lock. Failures are logged, never returned.
    pub async fn refresh_now(&self, key: &CacheKey, compute: ComputeFn<V>, scope: &ComputeScope) {
        refresh(self.store.clone(), key.clone(), compute, scope.clone(), None).await;
    }

    /// Bind a policy and compute function into a cache-backed endpoint.
    pub fn cached(
        self: &Arc<Self>,
        policy: RevalidatePolicy,
        compute: ComputeFn<V>,
    ) -> CachedEndpoint<V> {
        CachedEndpoint {
            coordinator: self.clone(),
            policy,
            compute,
        }
    }

    /// Acquire the refresh lock for `key` and hand the refresh job to the
    /// dispatcher. A no-op when another refresh is already in flight.
    async fn begin_refresh(
        &self,
        key: &CacheKey,
        policy: &RevalidatePolicy,
        compute: ComputeFn<V>,
        scope: &ComputeScope,
    ) {
        let marker = key.refresh_marker();
        match self.store.try_lock(&marker, policy.refresh_margin).await {
            Ok(true) => {}
            Ok(false) => return,
            Err(err) => {
                warn!(key = %key, error = %err, "refresh lock acquisition failed");
                return;
            }
        }

        let job = refresh(
            self.store.clone(),
            key.clone(),
            compute,
            scope.clone(),
            Some(marker.clone()),
        );
        if !self.dispatcher.dispatch(Box::pin(job)) {
            // Release immediately so the next stale read can retry rather
            // than waiting out the lock TTL.
            warn!(key = %key, "refresh dispatch rejected, releasing lock");
            if let Err(err) = self.store.unlock(&marker).await {
                warn!(key = %key, error = %err, "failed to release refresh lock");
            }
        }
    }
}

/// The refresh path shared by background workers and periodic jobs.
///
/// Computes a fresh value and stores it; on failure the previously stored
/// entry survives. The lock, when present, is released in both outcomes.
/// Nothing here propagates to any reader.
async fn refresh<V>(
    store: Arc<dyn CacheStore<V>>,
    key: CacheKey,
    compute: ComputeFn<V>,
    scope: ComputeScope,
    marker: Option<String>,
) where
    V: Clone + Send + Sync + 'static,
{
    match (compute)(scope).await {
        Ok(value) => match store.set(key.as_str(), CacheEntry::new(value), None).await {
            Ok(()) => debug!(key = %key, "cache refreshed"),
            Err(err) => warn!(key = %key, error = %err, "refresh store write failed"),
        },
        Err(err) => {
            warn!(key = %key, error = %err, "refresh compute failed, keeping previous entry");
        }
    }

    if let Some(marker) = marker {
        if let Err(err) = store.unlock(&marker).await {
            warn!(key = %key, error = %err, "failed to release refresh lock");
        }
    }
}

/// A cache-backed operation bound to its policy and compute function.
///
/// The decorator analog: callers register `(policy, compute)` once and get
/// back a callable that resolves requests through the coordinator.
pub struct CachedEndpoint<V> {
    coordinator: Arc<Coordinator<V>>,
    policy: RevalidatePolicy,
    compute: ComputeFn<V>,
}

impl<V> CachedEndpoint<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Resolve a request: derive the key, detect the forced-refresh flag,
    /// and run the coordinator's resolve path.
    pub async fn call(
        &self,
        identity: &RequestIdentity,
        scope: &ComputeScope,
    ) -> CacheResult<Resolution<V>> {
        let key = self.coordinator.keys().derive(identity);
        let force = self.coordinator.keys().force_refresh(identity);
        self.coordinator
            .resolve(&key, &self.policy, self.compute.clone(), scope, force)
            .await
    }

    /// The policy this endpoint was registered with.
    pub fn policy(&self) -> &RevalidatePolicy {
        &self.policy
    }
}

impl<V> Clone for CachedEndpoint<V> {
    fn clone(&self) -> Self {
        Self {
            coordinator: self.coordinator.clone(),
            policy: self.policy,
            compute: self.compute.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(CacheStatus::Hit.to_string(), "HIT");
        assert_eq!(CacheStatus::Stale.to_string(), "STALE");
        assert_eq!(CacheStatus::Miss.to_string(), "MISS");
        assert_eq!(CacheStatus::Accepted.to_string(), "ACCEPTED");
    }

    #[test]
    fn test_freshness_window_signed() {
        assert_eq!(RevalidatePolicy::from_secs(20, 10).freshness_window(), 10);
        assert_eq!(RevalidatePolicy::from_secs(0, 0).freshness_window(), 0);
        assert_eq!(RevalidatePolicy::from_secs(5, 10).freshness_window(), -5);
    }

    #[test]
    fn test_accepted_carries_no_value() {
        let resolution: Resolution<String> = Resolution::accepted();
        assert!(resolution.value.is_none());
        assert_eq!(resolution.status, CacheStatus::Accepted);
    }
}
