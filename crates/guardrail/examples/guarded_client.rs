//! A tower client protected by a chain of guards.
//!
//! The chain admits a request only if the flow rate barrier has room, the
//! circuit is not open and a concurrency permit is free. The same chain is
//! applied to a tower service with `GuardLayer`.
//!
//! Run with:
//! ```sh
//! cargo run -p guardrail --example guarded_client --features full
//! ```

use guardrail::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::{service_fn, Layer, Service, ServiceExt};

#[derive(Debug)]
struct UpstreamError(&'static str);

impl std::fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "upstream error: {}", self.0)
    }
}

impl std::error::Error for UpstreamError {}

#[tokio::main]
async fn main() {
    let breaker = CircuitBreaker::builder()
        .name("upstream")
        .threshold(2)
        .reset_interval(Duration::from_millis(300))
        .on_state_transition(|from, to| println!("  [upstream breaker] {from} -> {to}"))
        .build()
        .expect("valid breaker");

    let chain = GuardChainBuilder::new()
        .name("client")
        .add(FlowRateBarrier::new(20, Duration::from_secs(1)).expect("valid barrier"))
        .and_then(|b| b.add(breaker.clone()))
        .and_then(|b| b.build_with(ConcurrencyThrottle::new(4, Duration::from_millis(20)).expect("valid throttle")))
        .expect("open chain");

    // The upstream fails requests 3 and 4.
    let hits = Arc::new(AtomicUsize::new(0));
    let h = Arc::clone(&hits);
    let upstream = service_fn(move |path: &'static str| {
        let n = h.fetch_add(1, Ordering::SeqCst);
        async move {
            if (3..5).contains(&n) {
                Err(UpstreamError("503"))
            } else {
                Ok(format!("GET {path} -> 200"))
            }
        }
    });

    let mut client = GuardLayer::new(chain).layer(upstream);

    for i in 0..8 {
        let response = client.ready().await.expect("ready").call("/status").await;
        match response {
            Ok(body) => println!("request {i}: {body}"),
            Err(GuardError::Rejected(why)) => println!("request {i}: not sent, {why}"),
            Err(GuardError::Inner(err)) => println!("request {i}: sent, {err}"),
        }
        if i == 5 {
            tokio::time::sleep(Duration::from_millis(350)).await;
        }
    }

    println!(
        "upstream saw {} requests; breaker is {}",
        hits.load(Ordering::SeqCst),
        breaker.state()
    );
}
