//! Concurrency throttle stress tests

use super::ConcurrencyTracker;
use guardrail_core::GuardExt;
use guardrail_throttle::ConcurrencyThrottle;
use std::time::{Duration, Instant};

/// Test: 10k tasks share 50 permits
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore]
async fn stress_many_waiters() {
    let throttle = ConcurrencyThrottle::new(50, Duration::from_secs(60)).unwrap();
    let tracker = ConcurrencyTracker::new();

    let start = Instant::now();
    let mut handles = Vec::new();
    for _ in 0..10_000 {
        let throttle = throttle.clone();
        let tracker = tracker.clone();
        handles.push(tokio::spawn(async move {
            throttle
                .execute(|| async move {
                    tracker.enter();
                    tokio::time::sleep(Duration::from_micros(100)).await;
                    tracker.exit();
                    Ok::<_, ()>(())
                })
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    println!("10k calls completed in {:?}", start.elapsed());
    println!("peak concurrency: {}", tracker.peak());
    assert!(tracker.peak() <= 50);
    assert_eq!(tracker.current(), 0);
    assert_eq!(throttle.available_permits(), 50);
}

/// Test: fail-fast throttle under a burst never over-admits
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore]
async fn stress_fail_fast_burst() {
    let throttle = ConcurrencyThrottle::new(10, Duration::ZERO).unwrap();
    let tracker = ConcurrencyTracker::new();

    let mut handles = Vec::new();
    for _ in 0..5_000 {
        let throttle = throttle.clone();
        let tracker = tracker.clone();
        handles.push(tokio::spawn(async move {
            throttle
                .execute(|| async move {
                    tracker.enter();
                    tokio::task::yield_now().await;
                    tracker.exit();
                    Ok::<_, ()>(())
                })
                .await
        }));
    }

    let mut rejected = 0;
    for handle in handles {
        if handle.await.unwrap().is_err() {
            rejected += 1;
        }
    }

    println!("rejected {rejected} of 5000, peak {}", tracker.peak());
    assert!(tracker.peak() <= 10);
    assert_eq!(throttle.available_permits(), 10);
}
