//! Fixed window admission behavior.

use guardrail_core::{GuardError, GuardExt};
use guardrail_flowrate::{FlowRateBarrier, WindowLimit};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

async fn burst(barrier: &FlowRateBarrier, calls: usize) -> usize {
    let mut admitted = 0;
    for _ in 0..calls {
        if barrier.execute(|| async { Ok::<_, ()>(()) }).await.is_ok() {
            admitted += 1;
        }
    }
    admitted
}

#[tokio::test(start_paused = true)]
async fn lenient_window_admits_one_extra_call() {
    let barrier = FlowRateBarrier::new(5, Duration::from_secs(1)).unwrap();
    assert_eq!(barrier.window_limit(), WindowLimit::Lenient);

    assert_eq!(burst(&barrier, 10).await, 6);
    assert_eq!(barrier.current_count(), 6);
}

#[tokio::test(start_paused = true)]
async fn strict_window_admits_exactly_max() {
    let barrier = FlowRateBarrier::builder()
        .max_requests_per_interval(5)
        .window_limit(WindowLimit::Strict)
        .build()
        .unwrap();

    assert_eq!(burst(&barrier, 10).await, 5);
}

#[tokio::test(start_paused = true)]
async fn rejection_carries_limit_details() {
    let barrier = FlowRateBarrier::builder()
        .name("search")
        .max_requests_per_interval(1)
        .reset_interval(Duration::from_millis(250))
        .window_limit(WindowLimit::Strict)
        .build()
        .unwrap();

    burst(&barrier, 1).await;
    let err = barrier
        .execute(|| async { Ok::<_, ()>(()) })
        .await
        .unwrap_err();

    assert!(err.is_flow_rate_exceeded());
    match err {
        GuardError::Rejected(rejection) => {
            assert_eq!(rejection.guard_name(), "search");
            assert_eq!(
                rejection.to_string(),
                "flow rate barrier 'search' exceeded 1 calls per 250ms"
            );
        }
        GuardError::Inner(()) => panic!("expected a rejection"),
    }
}

#[tokio::test(start_paused = true)]
async fn each_window_gets_a_fresh_budget() {
    let barrier = FlowRateBarrier::builder()
        .max_requests_per_interval(3)
        .reset_interval(Duration::from_millis(100))
        .window_limit(WindowLimit::Strict)
        .build()
        .unwrap();

    for _ in 0..4 {
        assert_eq!(burst(&barrier, 5).await, 3);
        sleep(barrier.time_until_reset()).await;
    }
}

#[tokio::test(start_paused = true)]
async fn boundaries_follow_creation_time() {
    let barrier = FlowRateBarrier::builder()
        .max_requests_per_interval(1)
        .reset_interval(Duration::from_millis(100))
        .window_limit(WindowLimit::Strict)
        .build()
        .unwrap();

    sleep(Duration::from_millis(90)).await;
    assert_eq!(burst(&barrier, 2).await, 1);
    assert_eq!(barrier.time_until_reset(), Duration::from_millis(10));

    // 10ms later a new window starts, not 100ms after the first call.
    sleep(Duration::from_millis(10)).await;
    assert_eq!(burst(&barrier, 2).await, 1);
}

#[tokio::test(start_paused = true)]
async fn idle_windows_report_a_single_reset() {
    let resets = Arc::new(Mutex::new(Vec::new()));
    let r = Arc::clone(&resets);
    let barrier = FlowRateBarrier::builder()
        .max_requests_per_interval(4)
        .reset_interval(Duration::from_millis(100))
        .on_window_reset(move |previous| r.lock().unwrap().push(previous))
        .build()
        .unwrap();

    burst(&barrier, 3).await;
    sleep(Duration::from_millis(550)).await;
    assert_eq!(barrier.current_count(), 0);
    assert_eq!(*resets.lock().unwrap(), vec![3]);
}

#[tokio::test(start_paused = true)]
async fn listeners_observe_admissions_and_rejections() {
    let counts = Arc::new(Mutex::new(Vec::new()));
    let rejected = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&counts);
    let r = Arc::clone(&rejected);
    let barrier = FlowRateBarrier::builder()
        .max_requests_per_interval(2)
        .on_call_permitted(move |count| c.lock().unwrap().push(count))
        .on_call_rejected(move |max| {
            assert_eq!(max, 2);
            r.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap();

    burst(&barrier, 5).await;
    assert_eq!(*counts.lock().unwrap(), vec![1, 2, 3]);
    assert_eq!(rejected.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn clones_share_the_window() {
    let barrier = FlowRateBarrier::builder()
        .max_requests_per_interval(2)
        .window_limit(WindowLimit::Strict)
        .build()
        .unwrap();
    let clone = barrier.clone();

    assert_eq!(burst(&barrier, 1).await, 1);
    assert_eq!(burst(&clone, 3).await, 1);
    assert!(!barrier.can_execute());
}

#[tokio::test(start_paused = true)]
async fn disposed_barrier_refuses_calls() {
    let barrier = FlowRateBarrier::new(100, Duration::from_secs(1)).unwrap();
    barrier.dispose();
    assert!(barrier.is_disposed());
    assert_eq!(burst(&barrier, 3).await, 0);
    assert_eq!(barrier.current_count(), 0);
}

#[test]
fn zero_settings_are_refused() {
    assert!(FlowRateBarrier::new(0, Duration::from_secs(1)).is_err());
    assert!(FlowRateBarrier::new(1, Duration::ZERO).is_err());
}
