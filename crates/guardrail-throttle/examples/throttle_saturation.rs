//! Saturating a concurrency throttle.
//!
//! Twelve tasks hit a throttle with four permits. Calls that cannot get a
//! permit within 50ms are rejected without running.
//!
//! Run with:
//! ```sh
//! cargo run -p guardrail-throttle --example throttle_saturation
//! ```

use guardrail_core::GuardExt;
use guardrail_throttle::ConcurrencyThrottle;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    let peak = Arc::new(AtomicUsize::new(0));
    let p = Arc::clone(&peak);

    let throttle = ConcurrencyThrottle::builder()
        .name("report-renderer")
        .max_concurrent_requests(4)
        .timeout(Duration::from_millis(50))
        .on_call_permitted(move |concurrent| {
            p.fetch_max(concurrent, Ordering::SeqCst);
        })
        .build()
        .expect("valid configuration");

    let mut handles = Vec::new();
    for id in 0..12u64 {
        let throttle = throttle.clone();
        handles.push(tokio::spawn(async move {
            throttle
                .execute(|| async move {
                    tokio::time::sleep(Duration::from_millis(30 + id * 5)).await;
                    Ok::<_, std::io::Error>(id)
                })
                .await
        }));
    }

    let (mut done, mut rejected) = (0, 0);
    for handle in handles {
        match handle.await {
            Ok(Ok(id)) => {
                done += 1;
                println!("report {id} rendered");
            }
            Ok(Err(err)) if err.is_throttled() => rejected += 1,
            Ok(Err(err)) => println!("render failed: {err}"),
            Err(join) => println!("task panicked: {join}"),
        }
    }

    println!(
        "rendered={done} rejected={rejected} peak concurrency={} (limit {})",
        peak.load(Ordering::SeqCst),
        throttle.max_concurrent_requests()
    );
}
