//! Basic usage example for the pacekit crate.

use pacekit::{
    AtomicCounter, CancellationToken, ConcurrentCache, Error, RateLimiter, RateLimiterConfig,
    WorkerPool,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() {
    println!("=== Basic Pacekit Example ===\n");

    // Example 1: Non-blocking admission
    limiter_example();

    println!("{}", "\n".to_owned() + "=".repeat(50).as_str() + "\n");

    // Example 2: Blocking with a deadline
    wait_example();

    println!("{}", "\n".to_owned() + "=".repeat(50).as_str() + "\n");

    // Example 3: Worker pool
    pool_example();

    println!("{}", "\n".to_owned() + "=".repeat(50).as_str() + "\n");

    // Example 4: Counter and cache
    shared_state_example();
}

fn limiter_example() {
    println!("1. Rate Limiter:");

    let limiter = RateLimiter::new(5);
    println!("   Created limiter allowing 5 requests/second");

    for i in 1..=7 {
        if limiter.allow() {
            println!("   Request {} - ✅ Allowed", i);
        } else {
            println!("   Request {} - ❌ Rate limited", i);
        }
    }

    println!("   Sleeping one interval...");
    thread::sleep(Duration::from_secs(1));
    println!("   After refill: {} tokens", limiter.available_tokens());

    println!("\n{}", limiter.metrics().summary());
}

fn wait_example() {
    println!("2. Waiting for Tokens:");

    let limiter = RateLimiter::with_config(RateLimiterConfig::new(2, Duration::from_millis(200)));
    let token = CancellationToken::with_timeout(Duration::from_millis(250));

    for i in 1..=5 {
        match limiter.wait(&token) {
            Ok(()) => println!("   Call {} - admitted", i),
            Err(Error::DeadlineExceeded) => {
                println!("   Call {} - gave up at the deadline", i);
                break;
            }
            Err(err) => {
                println!("   Call {} - {}", i, err);
                break;
            }
        }
    }
}

fn pool_example() {
    println!("3. Worker Pool:");

    let pool = WorkerPool::new(3);
    let counter = Arc::new(AtomicCounter::new(0));
    pool.start();

    for _ in 0..10 {
        let counter = Arc::clone(&counter);
        if let Err(err) = pool.submit(move || {
            counter.increment(1);
        }) {
            println!("   Submit failed: {}", err);
        }
    }

    pool.wait();
    println!("   Counter after wait: {}", counter.get());

    pool.stop();
    println!("   Submit after stop: {:?}", pool.submit(|| {}));
    println!("\n{}", pool.stats().summary());
}

fn shared_state_example() {
    println!("4. Shared State:");

    let counter = AtomicCounter::new(10);
    println!("   increment(5) -> {}", counter.increment(5));
    println!("   decrement(3) -> {}", counter.decrement(3));
    println!("   reset()      -> {} (now {})", counter.reset(), counter.get());

    let cache = ConcurrentCache::new();
    println!("   get_or_set(k, v1) -> {:?}", cache.get_or_set("k", "v1"));
    println!("   get_or_set(k, v2) -> {:?}", cache.get_or_set("k", "v2"));

    let computed = cache.get_or_compute("lazy", || "computed once");
    println!("   get_or_compute    -> {}", computed);
    println!("   keys: {:?}, size: {}", cache.keys(), cache.size());
}
