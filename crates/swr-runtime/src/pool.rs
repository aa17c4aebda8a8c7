//! Bounded worker pool for background refresh jobs.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use swr_cache::RefreshDispatcher;
use swr_core::CoordinatorConfig;

type Job = BoxFuture<'static, ()>;

/// Bounded pool of workers executing refresh jobs.
///
/// Submission is fire-and-forget: no result flows back. Jobs beyond the
/// queue depth are rejected rather than queued unboundedly, and the
/// coordinator treats a rejection like any other skipped refresh.
pub struct WorkerPool {
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Start `workers` tasks draining a queue of at most `queue_depth` jobs.
    pub fn new(workers: usize, queue_depth: usize) -> Self {
        let (tx, rx) = mpsc::channel::<Job>(queue_depth.max(1));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let handles = (0..workers.max(1))
            .map(|worker| {
                let rx = rx.clone();
                tokio::spawn(async move {
                    loop {
                        let job = rx.lock().await.recv().await;
                        match job {
                            Some(job) => job.await,
                            None => break,
                        }
                    }
                    debug!(worker, "refresh worker drained");
                })
            })
            .collect();

        Self {
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(handles),
        }
    }

    /// Create a pool sized from coordinator configuration.
    pub fn from_config(config: &CoordinatorConfig) -> Self {
        Self::new(config.workers, config.queue_depth)
    }

    /// Submit a job. Returns false when the queue is full or the pool has
    /// shut down.
    pub fn submit(&self, job: Job) -> bool {
        let sender = lock(&self.sender);
        match sender.as_ref() {
            Some(tx) => match tx.try_send(job) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    warn!("refresh queue full, job rejected");
                    false
                }
                Err(TrySendError::Closed(_)) => false,
            },
            None => false,
        }
    }

    /// Stop accepting work and wait up to `grace` for queued and in-flight
    /// jobs to finish; abort whatever remains.
    pub async fn shutdown(&self, grace: Duration) {
        lock(&self.sender).take();

        let handles: Vec<JoinHandle<()>> = lock(&self.workers).drain(..).collect();
        let deadline = tokio::time::Instant::now() + grace;
        for mut handle in handles {
            if tokio::time::timeout_at(deadline, &mut handle).await.is_err() {
                warn!("refresh worker did not drain in time, aborting");
                handle.abort();
            }
        }
    }
}

impl RefreshDispatcher for WorkerPool {
    fn dispatch(&self, job: BoxFuture<'static, ()>) -> bool {
        self.submit(job)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
