//! Replay read traffic against demo endpoints.
//!
//! The endpoint set mirrors a trading dashboard: slow computations cached
//! with different freshness policies, including a zero-window endpoint that
//! revalidates on every read.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Args;

use swr_cache::{
    compute_fn, now_epoch_secs, CacheKey, CachedEndpoint, ComputeFn, Coordinator, MemoryStore,
    RevalidatePolicy,
};
use swr_core::{ComputeScope, CoordinatorConfig, RequestIdentity};
use swr_runtime::{PeriodicScheduler, WorkerPool};

use crate::output::Output;

/// Arguments for the `simulate` command.
#[derive(Args)]
pub struct SimulateArgs {
    /// Number of read passes over the endpoints
    #[arg(long, default_value_t = 6)]
    pub passes: u32,

    /// Gap between passes in milliseconds
    #[arg(long, default_value_t = 2000)]
    pub gap_ms: u64,

    /// Interval for the periodic /trade_summary refresh, in seconds
    #[arg(long, default_value_t = 10)]
    pub refresh_interval: u64,

    /// Issue a forced refresh of /delta_positions before the final pass
    #[arg(long)]
    pub force: bool,
}

/// A slow computation returning a timestamped payload.
fn demo_compute(label: &'static str, delay: Duration) -> ComputeFn<String> {
    compute_fn(move |scope| async move {
        tokio::time::sleep(delay).await;
        Ok(format!(
            "{label} at t={} (req {})",
            now_epoch_secs(),
            scope.request_id()
        ))
    })
}

pub async fn run(args: SimulateArgs, config: &CoordinatorConfig, output: &Output) -> Result<()> {
    let store: Arc<MemoryStore<String>> = Arc::new(MemoryStore::new());
    let pool = Arc::new(WorkerPool::from_config(config));
    let coordinator = Arc::new(Coordinator::new(store, pool.clone(), config));
    let scheduler = PeriodicScheduler::new(coordinator.clone());

    let trade_summary = demo_compute("trade summary", Duration::from_millis(500));
    let endpoints: Vec<(&str, CachedEndpoint<String>)> = vec![
        (
            "/delta_positions",
            coordinator.cached(
                RevalidatePolicy::from_secs(20, 10),
                demo_compute("delta positions", Duration::from_millis(1000)),
            ),
        ),
        (
            "/trade_summary",
            coordinator.cached(RevalidatePolicy::from_secs(10, 0), trade_summary.clone()),
        ),
        (
            "/product_betas",
            coordinator.cached(
                RevalidatePolicy::from_secs(0, 0),
                demo_compute("product betas", Duration::from_millis(400)),
            ),
        ),
    ];

    scheduler.schedule(
        CacheKey::new("/trade_summary"),
        Duration::from_secs(args.refresh_interval),
        trade_summary,
        ComputeScope::new(),
    );
    output.debug(&format!(
        "scheduled periodic /trade_summary refresh every {}s",
        args.refresh_interval
    ));

    for pass in 1..=args.passes {
        output.info(&format!("pass {pass}/{}", args.passes));
        for (path, endpoint) in &endpoints {
            let identity = RequestIdentity::new(*path);
            let scope = ComputeScope::new();
            let started = Instant::now();
            let resolution = endpoint.call(&identity, &scope).await?;
            output.resolution(
                path,
                resolution.status,
                resolution.value.as_deref(),
                started.elapsed().as_millis(),
            );
        }

        if args.force && pass == args.passes.saturating_sub(1) {
            let forced = RequestIdentity::new("/delta_positions")
                .with_param(config.control_param.clone(), "true");
            let started = Instant::now();
            let resolution = endpoints[0].1.call(&forced, &ComputeScope::new()).await?;
            output.resolution(
                "/delta_positions!",
                resolution.status,
                resolution.value.as_deref(),
                started.elapsed().as_millis(),
            );
        }

        if pass < args.passes {
            tokio::time::sleep(Duration::from_millis(args.gap_ms)).await;
        }
    }

    scheduler.shutdown();
    pool.shutdown(config.shutdown_grace()).await;
    output.success("simulation complete");
    Ok(())
}
