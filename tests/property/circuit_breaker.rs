//! Property tests for the circuit breaker.
//!
//! Invariants tested:
//! - The failure count stays within `0..=threshold`
//! - The circuit opens exactly when the count reaches the threshold
//! - Open circuits never run the action

use guardrail_circuitbreaker::{CircuitBreaker, CircuitState};
use guardrail_core::GuardExt;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::runtime::Runtime;

/// Reference model of a breaker whose reset interval never elapses.
struct Model {
    threshold: usize,
    count: usize,
    open: bool,
}

impl Model {
    fn call(&mut self, ok: bool) -> bool {
        if self.open {
            return false;
        }
        if ok {
            self.count = self.count.saturating_sub(1);
        } else {
            self.count = (self.count + 1).min(self.threshold);
            self.open = self.count == self.threshold;
        }
        true
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: the breaker follows the counting model call for call
    #[test]
    fn breaker_matches_counting_model(
        threshold in 1usize..=8,
        outcomes in prop::collection::vec(any::<bool>(), 0..64),
    ) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let breaker = CircuitBreaker::new(threshold, Duration::from_secs(3600)).unwrap();
            let runs = AtomicUsize::new(0);
            let mut model = Model { threshold, count: 0, open: false };
            let mut expected_runs = 0;

            for ok in outcomes {
                let ran = model.call(ok);
                expected_runs += usize::from(ran);

                let result = breaker
                    .execute(|| async {
                        runs.fetch_add(1, Ordering::SeqCst);
                        if ok { Ok(()) } else { Err(()) }
                    })
                    .await;

                prop_assert_eq!(result.as_ref().is_err_and(|e| e.is_circuit_open()), !ran);
                prop_assert!(breaker.failure_count() <= threshold);
                prop_assert_eq!(breaker.failure_count(), model.count);
                let expected_state = if model.open { CircuitState::Open } else { CircuitState::Closed };
                prop_assert_eq!(breaker.state(), expected_state);
            }
            prop_assert_eq!(runs.load(Ordering::SeqCst), expected_runs);
            Ok(())
        })?;
    }

    /// Property: successes alone never move the count below zero or open the circuit
    #[test]
    fn successes_never_open(successes in 0usize..100, threshold in 1usize..10) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let breaker = CircuitBreaker::new(threshold, Duration::from_secs(3600)).unwrap();
            for _ in 0..successes {
                breaker.execute(|| async { Ok::<_, ()>(()) }).await.unwrap();
            }
            assert_eq!(breaker.failure_count(), 0);
            assert_eq!(breaker.state(), CircuitState::Closed);
            assert_eq!(breaker.current_service_level(), 100.0);
        });
    }
}
