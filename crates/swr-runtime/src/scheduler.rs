//! Periodic per-key refresh jobs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use swr_cache::{CacheKey, ComputeFn, Coordinator};
use swr_core::ComputeScope;

/// Scheduler running recurring refresh jobs, one per cache key.
///
/// Each job invokes the coordinator's refresh path on a fixed interval,
/// regardless of the entry's current freshness and independent of read
/// traffic. Jobs live until the scheduler shuts down; there is no
/// unregister operation.
pub struct PeriodicScheduler<V> {
    coordinator: Arc<Coordinator<V>>,
    jobs: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl<V> PeriodicScheduler<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a scheduler refreshing through `coordinator`.
    pub fn new(coordinator: Arc<Coordinator<V>>) -> Self {
        Self {
            coordinator,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Register a recurring refresh for `key`, first firing one full
    /// interval from now.
    ///
    /// Registration is idempotent by key: the first registration wins and
    /// later calls are ignored even if they carry a different interval or
    /// compute function. Returns true if the job was newly registered.
    pub fn schedule(
        &self,
        key: CacheKey,
        interval: Duration,
        compute: ComputeFn<V>,
        scope: ComputeScope,
    ) -> bool {
        let mut jobs = lock(&self.jobs);
        if jobs.contains_key(key.as_str()) {
            debug!(key = %key, "periodic refresh already registered, ignoring");
            return false;
        }

        let coordinator = self.coordinator.clone();
        let job_key = key.clone();
        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            loop {
                ticker.tick().await;
                debug!(key = %job_key, "periodic refresh");
                coordinator
                    .refresh_now(&job_key, compute.clone(), &scope)
                    .await;
            }
        });

        jobs.insert(key.as_str().to_string(), handle);
        debug!(key = %key, interval_secs = interval.as_secs(), "periodic refresh registered");
        true
    }

    /// Number of registered jobs.
    pub fn job_count(&self) -> usize {
        lock(&self.jobs).len()
    }

    /// Whether a job is registered for `key`.
    pub fn is_scheduled(&self, key: &CacheKey) -> bool {
        lock(&self.jobs).contains_key(key.as_str())
    }

    /// Stop all jobs.
    pub fn shutdown(&self) {
        for (key, handle) in lock(&self.jobs).drain() {
            handle.abort();
            debug!(key = %key, "periodic refresh stopped");
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
