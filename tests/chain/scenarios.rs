//! End-to-end scenarios with the real guards.

use guardrail::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

#[tokio::test(start_paused = true)]
async fn breaker_stops_calling_after_three_failures() {
    let breaker = CircuitBreaker::new(3, Duration::from_secs(1)).unwrap();
    let side_effects = AtomicUsize::new(0);

    for _ in 0..3 {
        let err = breaker
            .execute(|| async {
                side_effects.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>("refused")
            })
            .await
            .unwrap_err();
        assert_eq!(err.into_inner(), Some("refused"));
    }
    assert_eq!(breaker.state(), CircuitState::Open);

    let fourth = breaker
        .execute(|| async {
            side_effects.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>("refused")
        })
        .await
        .unwrap_err();
    assert!(fourth.is_circuit_open());
    assert_eq!(side_effects.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn throttle_of_two_rejects_one_of_three() {
    let throttle = ConcurrencyThrottle::new(2, Duration::ZERO).unwrap();

    let tasks: Vec<_> = (0..3)
        .map(|i| {
            let throttle = throttle.clone();
            tokio::spawn(async move {
                throttle
                    .execute(|| async move {
                        sleep(Duration::from_secs(5)).await;
                        Ok::<_, ()>(i)
                    })
                    .await
            })
        })
        .collect();

    let mut throttled = 0;
    let mut completed = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => completed += 1,
            Err(err) if err.is_throttled() => throttled += 1,
            Err(err) => panic!("unexpected error: {err:?}"),
        }
    }
    assert_eq!((completed, throttled), (2, 1));
}

#[tokio::test(start_paused = true)]
async fn breaker_recovers_through_half_open() {
    let healthy = Arc::new(AtomicUsize::new(0));
    let breaker = CircuitBreaker::new(2, Duration::from_secs(1)).unwrap();
    let chain = GuardChainBuilder::new()
        .add(FlowRateBarrier::new(100, Duration::from_secs(1)).unwrap())
        .unwrap()
        .build_with(breaker.clone())
        .unwrap();

    let call = |ok: bool| {
        let healthy = Arc::clone(&healthy);
        let chain = chain.clone();
        async move {
            chain
                .execute(|| async move {
                    if ok {
                        healthy.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    } else {
                        Err("down")
                    }
                })
                .await
        }
    };

    call(false).await.unwrap_err();
    call(false).await.unwrap_err();
    assert!(call(true).await.unwrap_err().is_circuit_open());

    sleep(Duration::from_secs(1)).await;
    assert_eq!(breaker.state(), CircuitState::HalfOpen);
    call(true).await.unwrap();
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(healthy.load(Ordering::SeqCst), 1);
}
