//! Simulate command - concurrent read-through traffic over the configured store

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use clap::Args;
use tokio::task::JoinSet;
use tracing::info;

use crate::domain::cache::{CacheKey, LookupPolicy, TtlPolicy};
use crate::infrastructure::stampede::ReadThroughCache;

/// Arguments for the simulate command
#[derive(Args, Clone, Debug)]
pub struct SimulateArgs {
    /// Number of distinct keys
    #[arg(long, default_value_t = 20)]
    pub keys: usize,

    /// Total number of lookups
    #[arg(long, default_value_t = 1_000)]
    pub requests: usize,

    /// Lookups in flight at once
    #[arg(long, default_value_t = 50)]
    pub concurrency: usize,

    /// Time each compute takes, in milliseconds
    #[arg(long, default_value_t = 20)]
    pub compute_ms: u64,

    /// Every n-th key resolves to nothing (0 disables negative results)
    #[arg(long, default_value_t = 5)]
    pub negative_every: usize,

    /// Positive TTL in seconds before jitter
    #[arg(long, default_value_t = 300)]
    pub ttl: u64,

    /// Drop process-local cache state after every n waves (0 never does)
    #[arg(long, default_value_t = 0)]
    pub reset_local_every: usize,
}

impl Default for SimulateArgs {
    fn default() -> Self {
        Self {
            keys: 20,
            requests: 1_000,
            concurrency: 50,
            compute_ms: 20,
            negative_every: 5,
            ttl: 300,
            reset_local_every: 0,
        }
    }
}

/// Totals collected by [`run_simulation`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationReport {
    pub requests: usize,
    pub computes: usize,
    pub found: usize,
    pub not_found: usize,
    pub local_resets: usize,
}

impl SimulationReport {
    /// Lookups answered without running the compute function
    pub fn served_from_cache(&self) -> usize {
        self.requests.saturating_sub(self.computes)
    }
}

pub async fn run(args: SimulateArgs) -> anyhow::Result<()> {
    let (_, stampedeless) = super::bootstrap().await?;
    let cache = ReadThroughCache::from_stampedeless(stampedeless);

    info!(
        backend = cache.stampedeless().store().backend_name(),
        keys = args.keys,
        requests = args.requests,
        concurrency = args.concurrency,
        "Starting simulation"
    );

    let started = Instant::now();
    let report = run_simulation(cache, &args).await?;

    println!("requests:          {}", report.requests);
    println!("computes:          {}", report.computes);
    println!("served from cache: {}", report.served_from_cache());
    println!("found / not found: {} / {}", report.found, report.not_found);
    println!("local resets:      {}", report.local_resets);
    println!("elapsed:           {:.2?}", started.elapsed());

    Ok(())
}

/// Issues `args.requests` lookups over `args.keys` keys, `args.concurrency`
/// at a time
pub async fn run_simulation(
    cache: ReadThroughCache,
    args: &SimulateArgs,
) -> anyhow::Result<SimulationReport> {
    anyhow::ensure!(args.keys > 0, "--keys must be at least 1");
    anyhow::ensure!(args.concurrency > 0, "--concurrency must be at least 1");

    let cache = Arc::new(cache);
    let computes = Arc::new(AtomicUsize::new(0));
    let ttl = Duration::from_secs(args.ttl);
    let policy = LookupPolicy::new(
        TtlPolicy::new(ttl, ttl / 10),
        TtlPolicy::new(ttl / 4, ttl / 8),
    );

    let mut report = SimulationReport::default();
    let mut issued = 0;
    let mut waves = 0;

    while issued < args.requests {
        let wave = args.concurrency.min(args.requests - issued);
        let mut tasks = JoinSet::new();

        for n in issued..issued + wave {
            let index = n % args.keys;
            let negative = args.negative_every > 0 && index % args.negative_every == 0;
            let compute_delay = Duration::from_millis(args.compute_ms);
            let cache = Arc::clone(&cache);
            let computes = Arc::clone(&computes);

            tasks.spawn(async move {
                let key = CacheKey::new("simulation", format!("item_{}", index));

                cache
                    .get_or_compute(&key, &policy, || async move {
                        computes.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(compute_delay).await;
                        (!negative).then_some(index as u64)
                    })
                    .await
            });
        }

        while let Some(result) = tasks.join_next().await {
            match result? {
                Some(_) => report.found += 1,
                None => report.not_found += 1,
            }
        }

        issued += wave;
        waves += 1;

        if args.reset_local_every > 0 && waves % args.reset_local_every == 0 {
            cache.stampedeless().store().reset_local().await?;
            report.local_resets += 1;
        }
    }

    report.requests = issued;
    report.computes = computes.load(Ordering::SeqCst);

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::Cache;
    use crate::infrastructure::cache::{InMemoryCache, LayeredCache, NullCache};
    use crate::infrastructure::stampede::StampedeConfig;

    fn args(concurrency: usize) -> SimulateArgs {
        SimulateArgs {
            keys: 10,
            requests: 200,
            concurrency,
            compute_ms: 1,
            negative_every: 5,
            ttl: 300,
            reset_local_every: 0,
        }
    }

    fn cache(store: Arc<dyn Cache>) -> ReadThroughCache {
        ReadThroughCache::new(store, StampedeConfig::default())
    }

    #[tokio::test]
    async fn test_sequential_traffic_computes_each_key_once() {
        let report = run_simulation(cache(Arc::new(InMemoryCache::new())), &args(1))
            .await
            .unwrap();

        assert_eq!(report.requests, 200);
        assert_eq!(report.computes, 10);
        // Keys 0 and 5 resolve to nothing
        assert_eq!(report.not_found, 40);
        assert_eq!(report.found, 160);
    }

    #[tokio::test]
    async fn test_concurrent_traffic_is_bounded_by_first_wave() {
        let report = run_simulation(cache(Arc::new(InMemoryCache::new())), &args(10))
            .await
            .unwrap();

        // Only the first wave can miss; every key is in it exactly once
        assert_eq!(report.computes, 10);
        assert_eq!(report.served_from_cache(), 190);
    }

    #[tokio::test]
    async fn test_disabled_store_computes_every_time() {
        let report = run_simulation(cache(Arc::new(NullCache::new())), &args(4))
            .await
            .unwrap();

        assert_eq!(report.computes, 200);
        assert_eq!(report.served_from_cache(), 0);
    }

    #[tokio::test]
    async fn test_local_resets_fall_back_to_shared_level() {
        let remote: Arc<dyn Cache> = Arc::new(InMemoryCache::new());
        let layered = Arc::new(LayeredCache::new(remote));
        let mut traffic = args(10);
        traffic.reset_local_every = 5;

        let report = run_simulation(cache(layered), &traffic).await.unwrap();

        // 20 waves, one reset every 5; entries survive in the shared level
        assert_eq!(report.local_resets, 4);
        assert_eq!(report.computes, 10);
    }

    #[tokio::test]
    async fn test_rejects_zero_keys() {
        let mut bad = args(1);
        bad.keys = 0;

        assert!(run_simulation(cache(Arc::new(NullCache::new())), &bad).await.is_err());
    }
}
