//! Scheduler and pool behavior against a live coordinator.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use swr_cache::{
    compute_fn, CacheKey, CacheStatus, CacheStore, ComputeFn, Coordinator, MemoryStore,
    RevalidatePolicy,
};
use swr_core::{ComputeScope, CoordinatorConfig};
use swr_runtime::{PeriodicScheduler, WorkerPool};

fn setup() -> (Arc<MemoryStore<String>>, Arc<Coordinator<String>>, Arc<WorkerPool>) {
    let config = CoordinatorConfig::default().with_workers(2).with_queue_depth(8);
    let store = Arc::new(MemoryStore::new());
    let pool = Arc::new(WorkerPool::from_config(&config));
    let coordinator = Arc::new(Coordinator::new(store.clone(), pool.clone(), &config));
    (store, coordinator, pool)
}

/// Compute function returning "v1", "v2", ... and counting invocations.
fn counting_compute(counter: Arc<AtomicUsize>) -> ComputeFn<String> {
    compute_fn(move |_scope| {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        async move { Ok(format!("v{n}")) }
    })
}

#[tokio::test]
async fn test_schedule_is_idempotent_by_key() {
    let (_store, coordinator, _pool) = setup();
    let scheduler = PeriodicScheduler::new(coordinator);
    let counter = Arc::new(AtomicUsize::new(0));
    let key = CacheKey::new("/trade_summary");

    assert!(scheduler.schedule(
        key.clone(),
        Duration::from_secs(10),
        counting_compute(counter.clone()),
        ComputeScope::new(),
    ));
    // Same key, different parameters: silently ignored, first wins.
    assert!(!scheduler.schedule(
        key.clone(),
        Duration::from_secs(99),
        counting_compute(counter.clone()),
        ComputeScope::new(),
    ));

    assert_eq!(scheduler.job_count(), 1);
    assert!(scheduler.is_scheduled(&key));
    scheduler.shutdown();
}

#[tokio::test]
async fn test_periodic_job_refreshes_regardless_of_freshness() {
    let (store, coordinator, _pool) = setup();
    let scheduler = PeriodicScheduler::new(coordinator.clone());
    let counter = Arc::new(AtomicUsize::new(0));
    let key = CacheKey::new("/trade_summary");

    scheduler.schedule(
        key.clone(),
        Duration::from_millis(30),
        counting_compute(counter.clone()),
        ComputeScope::new(),
    );

    tokio::time::sleep(Duration::from_millis(100)).await;
    scheduler.shutdown();

    // Fired at 30/60/90ms even though the entry written at 30ms was still
    // fresh by any policy's standard.
    let fired = counter.load(Ordering::SeqCst);
    assert!(fired >= 2, "expected at least 2 refreshes, got {fired}");
    let entry = store.get(key.as_str()).await.unwrap().unwrap();
    let stored: usize = entry.data.trim_start_matches('v').parse().unwrap();
    assert!(stored >= 2);
}

#[tokio::test]
async fn test_shutdown_stops_jobs() {
    let (_store, coordinator, _pool) = setup();
    let scheduler = PeriodicScheduler::new(coordinator);
    let counter = Arc::new(AtomicUsize::new(0));

    scheduler.schedule(
        CacheKey::new("/trade_summary"),
        Duration::from_millis(20),
        counting_compute(counter.clone()),
        ComputeScope::new(),
    );
    tokio::time::sleep(Duration::from_millis(50)).await;
    scheduler.shutdown();
    assert_eq!(scheduler.job_count(), 0);

    let snapshot = counter.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(counter.load(Ordering::SeqCst), snapshot);
}

#[tokio::test]
async fn test_pool_backs_coordinator_stale_refresh() {
    let (store, coordinator, pool) = setup();
    let counter = Arc::new(AtomicUsize::new(0));
    let key = CacheKey::new("/delta_positions");
    let policy = RevalidatePolicy::from_secs(20, 10);
    let scope = ComputeScope::new();
    let compute = counting_compute(counter.clone());

    let r = coordinator
        .resolve(&key, &policy, compute.clone(), &scope, false)
        .await
        .unwrap();
    assert_eq!(r.status, CacheStatus::Miss);

    // Age the entry out of its freshness window, then read again.
    let entry = store.get(key.as_str()).await.unwrap().unwrap();
    store
        .set(
            key.as_str(),
            swr_cache::CacheEntry::at(entry.data, entry.timestamp - 12),
            None,
        )
        .await
        .unwrap();

    let r = coordinator
        .resolve(&key, &policy, compute.clone(), &scope, false)
        .await
        .unwrap();
    assert_eq!(r.status, CacheStatus::Stale);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert_eq!(store.get(key.as_str()).await.unwrap().unwrap().data, "v2");

    pool.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn test_saturated_pool_releases_refresh_lock() {
    // Pool with one busy worker and a full queue refuses the dispatch; the
    // coordinator must release the lock so a later read can retry.
    let config = CoordinatorConfig::default().with_workers(1).with_queue_depth(1);
    let store: Arc<MemoryStore<String>> = Arc::new(MemoryStore::new());
    let pool = Arc::new(WorkerPool::from_config(&config));
    let coordinator = Arc::new(Coordinator::new(store.clone(), pool.clone(), &config));

    pool.submit(Box::pin(async {
        tokio::time::sleep(Duration::from_secs(60)).await;
    }));
    tokio::time::sleep(Duration::from_millis(20)).await;
    pool.submit(Box::pin(async {
        tokio::time::sleep(Duration::from_secs(60)).await;
    }));

    let counter = Arc::new(AtomicUsize::new(0));
    let key = CacheKey::new("/delta_positions");
    let policy = RevalidatePolicy::from_secs(20, 10);
    let scope = ComputeScope::new();

    store
        .set(
            key.as_str(),
            swr_cache::CacheEntry::at("old".to_string(), swr_cache::now_epoch_secs() - 12),
            None,
        )
        .await
        .unwrap();

    let r = coordinator
        .resolve(&key, &policy, counting_compute(counter.clone()), &scope, false)
        .await
        .unwrap();
    assert_eq!(r.status, CacheStatus::Stale);

    // Dispatch was refused, but the lock was released rather than left to
    // expire: the marker is immediately acquirable.
    assert!(store
        .try_lock(&key.refresh_marker(), Duration::from_secs(10))
        .await
        .unwrap());
}
