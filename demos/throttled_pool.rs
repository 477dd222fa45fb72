//! A worker pool whose tasks share per-tenant rate limits, with a cache of
//! results and a background cleanup of idle tenants.

use pacekit::{
    CancellationToken, ConcurrentCache, KeyedRateLimiter, RateLimiterConfig, WorkerPoolBuilder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn main() {
    let limits = Arc::new(KeyedRateLimiter::new(RateLimiterConfig::new(
        4,
        Duration::from_millis(200),
    )));
    let cleanup = Arc::clone(&limits)
        .spawn_cleanup(Duration::from_millis(100), Duration::from_millis(500))
        .ok();

    let results = Arc::new(ConcurrentCache::new());
    let token = CancellationToken::with_timeout(Duration::from_secs(5));
    let pool = WorkerPoolBuilder::new()
        .workers(4)
        .queue_capacity(8)
        .thread_name("tenant")
        .start();

    let start = Instant::now();
    for job in 0..24 {
        let tenant = ["acme", "globex", "initech"][job % 3];
        let limits = Arc::clone(&limits);
        let results = Arc::clone(&results);
        let token = token.clone();

        let submitted = pool.submit(move || match limits.wait(&tenant, &token) {
            Ok(()) => {
                results.set(format!("{tenant}-{job}"), start.elapsed());
            }
            Err(err) => println!("{tenant} job {job}: {err}"),
        });
        if let Err(err) = submitted {
            println!("job {job} rejected: {err}");
        }
    }

    pool.wait();
    println!("Finished {} jobs in {:?}", results.size(), start.elapsed());

    let mut keys = results.keys();
    keys.sort();
    for key in keys.iter().take(6) {
        if let Some(at) = results.get(key) {
            println!("  {key:<12} admitted at {at:?}");
        }
    }

    println!("\n{}", limits.stats());
    pool.stop();
    println!("\n{}", pool.stats());

    if let Some(cleanup) = cleanup {
        cleanup.stop();
    }
}
