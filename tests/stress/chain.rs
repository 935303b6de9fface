//! Guard chain stress tests

use super::ConcurrencyTracker;
use guardrail::prelude::*;
use std::time::{Duration, Instant};

/// Test: a full chain under sustained concurrent load
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore]
async fn stress_full_chain() {
    let chain = GuardChainBuilder::new()
        .add(FlowRateBarrier::new(1_000_000, Duration::from_secs(1)).unwrap())
        .unwrap()
        .add(CircuitBreaker::new(1_000, Duration::from_secs(30)).unwrap())
        .unwrap()
        .build_with(ConcurrencyThrottle::new(64, Duration::from_secs(30)).unwrap())
        .unwrap();
    let tracker = ConcurrencyTracker::new();

    let start = Instant::now();
    let mut handles = Vec::new();
    for i in 0..50_000u32 {
        let chain = chain.clone();
        let tracker = tracker.clone();
        handles.push(tokio::spawn(async move {
            chain
                .execute(|| async move {
                    tracker.enter();
                    tokio::task::yield_now().await;
                    tracker.exit();
                    if i % 97 == 0 { Err(i) } else { Ok(i) }
                })
                .await
        }));
    }

    let mut failed = 0;
    for handle in handles {
        if let Err(err) = handle.await.unwrap() {
            assert!(!err.is_rejected(), "unexpected rejection: {err:?}");
            failed += 1;
        }
    }

    println!("50k chained calls in {:?}, {failed} failed", start.elapsed());
    assert!(tracker.peak() <= 64);
}
