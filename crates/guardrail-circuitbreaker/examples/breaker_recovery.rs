//! Circuit breaker tripping and recovering.
//!
//! A backend fails its first three calls and then recovers. The breaker opens
//! after three failures, rejects calls while open, probes once the reset
//! interval has passed, and closes again when the probe succeeds.
//!
//! Run with:
//! ```sh
//! cargo run -p guardrail-circuitbreaker --example breaker_recovery --features tracing
//! ```

use guardrail_circuitbreaker::CircuitBreaker;
use guardrail_core::{GuardError, GuardExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug)]
struct BackendError(usize);

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "backend failed on call {}", self.0)
    }
}

impl std::error::Error for BackendError {}

async fn call_backend(calls: &AtomicUsize) -> Result<String, BackendError> {
    let n = calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(5)).await;
    if n < 3 {
        Err(BackendError(n))
    } else {
        Ok(format!("response #{n}"))
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    let breaker = CircuitBreaker::builder()
        .name("backend")
        .threshold(3)
        .reset_interval(Duration::from_millis(200))
        .on_state_transition(|from, to| println!("  [breaker] {from} -> {to}"))
        .build()
        .expect("valid configuration");

    let calls = Arc::new(AtomicUsize::new(0));

    for round in 0..8 {
        let result = breaker.execute(|| call_backend(&calls)).await;
        match result {
            Ok(body) => println!("round {round}: ok {body}"),
            Err(GuardError::Rejected(rejection)) => println!("round {round}: skipped, {rejection}"),
            Err(GuardError::Inner(err)) => println!("round {round}: attempted, {err}"),
        }
        println!(
            "  state={} failures={} service level={:.0}%",
            breaker.state(),
            breaker.failure_count(),
            breaker.current_service_level()
        );

        if round == 4 {
            println!("waiting for the reset interval...");
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
    }

    println!("backend was invoked {} times", calls.load(Ordering::SeqCst));
}
