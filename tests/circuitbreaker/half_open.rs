use super::{fail, succeed, Boom};
use guardrail_circuitbreaker::{CircuitBreaker, CircuitState};
use guardrail_core::{GuardError, GuardExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::sleep;

const INTERVAL: Duration = Duration::from_secs(1);

async fn tripped(threshold: usize) -> CircuitBreaker {
    let breaker = CircuitBreaker::new(threshold, INTERVAL).unwrap();
    for _ in 0..threshold {
        fail(&breaker).await.unwrap_err();
    }
    assert_eq!(breaker.state(), CircuitState::Open);
    breaker
}

#[tokio::test(start_paused = true)]
async fn opens_to_half_open_after_interval() {
    let breaker = tripped(1).await;

    sleep(INTERVAL - Duration::from_millis(1)).await;
    assert_eq!(breaker.state(), CircuitState::Open);

    sleep(Duration::from_millis(1)).await;
    assert_eq!(breaker.state(), CircuitState::HalfOpen);
    assert!(breaker.can_execute());
}

#[tokio::test(start_paused = true)]
async fn successful_probe_closes_circuit() {
    let breaker = tripped(3).await;
    sleep(INTERVAL).await;

    succeed(&breaker).await.unwrap();
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(breaker.failure_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn failed_probe_reopens_circuit() {
    let breaker = tripped(3).await;
    sleep(INTERVAL).await;

    assert_eq!(fail(&breaker).await.unwrap_err(), GuardError::Inner(Boom));
    assert_eq!(breaker.state(), CircuitState::Open);

    // A fresh open period starts with the failed probe.
    sleep(INTERVAL / 2).await;
    assert_eq!(breaker.state(), CircuitState::Open);
    sleep(INTERVAL / 2).await;
    assert_eq!(breaker.state(), CircuitState::HalfOpen);
}

#[tokio::test(start_paused = true)]
async fn only_one_probe_runs_at_a_time() {
    let breaker = tripped(1).await;
    sleep(INTERVAL).await;

    let (release, held) = oneshot::channel::<()>();
    let probe_runs = AtomicUsize::new(0);

    let probe = breaker.execute(|| async {
        probe_runs.fetch_add(1, Ordering::SeqCst);
        let _ = held.await;
        Ok::<_, Boom>(())
    });
    let competitor = async {
        tokio::task::yield_now().await;
        let result = succeed(&breaker).await;
        let _ = release.send(());
        result
    };

    let (probe, competitor) = tokio::join!(probe, competitor);
    probe.unwrap();
    assert!(competitor.unwrap_err().is_circuit_open());
    assert_eq!(probe_runs.load(Ordering::SeqCst), 1);
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn abandoned_probe_frees_the_slot() {
    let breaker = tripped(1).await;
    sleep(INTERVAL).await;

    let abandoned = tokio::time::timeout(
        Duration::from_millis(10),
        breaker.execute(|| std::future::pending::<Result<(), Boom>>()),
    )
    .await;
    assert!(abandoned.is_err());
    assert_eq!(breaker.state(), CircuitState::HalfOpen);

    succeed(&breaker).await.unwrap();
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn transitions_are_reported_in_order() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&seen);
    let breaker = CircuitBreaker::builder()
        .threshold(1)
        .reset_interval(INTERVAL)
        .on_state_transition(move |from, to| s.lock().unwrap().push((from, to)))
        .build()
        .unwrap();

    fail(&breaker).await.unwrap_err();
    sleep(INTERVAL).await;
    succeed(&breaker).await.unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            (CircuitState::Closed, CircuitState::Open),
            (CircuitState::Open, CircuitState::HalfOpen),
            (CircuitState::HalfOpen, CircuitState::Closed),
        ]
    );
}
