use futures::future::join_all;
use guardrail_core::GuardExt;
use guardrail_throttle::ConcurrencyThrottle;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;
use tokio::time::sleep;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn fail_fast_throttle_rejects_the_extra_caller() {
    let throttle = ConcurrencyThrottle::new(2, Duration::ZERO).unwrap();
    let hold = Arc::new(Barrier::new(3));
    let runs = Arc::new(AtomicUsize::new(0));

    let mut holders = Vec::new();
    for _ in 0..2 {
        let throttle = throttle.clone();
        let hold = Arc::clone(&hold);
        let runs = Arc::clone(&runs);
        holders.push(tokio::spawn(async move {
            throttle
                .execute(|| async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    hold.wait().await;
                    Ok::<_, ()>(())
                })
                .await
        }));
    }

    while throttle.concurrent_calls() < 2 {
        tokio::task::yield_now().await;
    }

    let third = throttle
        .execute(|| async {
            runs.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ()>(())
        })
        .await
        .unwrap_err();
    assert!(third.is_throttled());

    hold.wait().await;
    for holder in holders {
        holder.await.unwrap().unwrap();
    }
    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert_eq!(throttle.available_permits(), 2);
}

#[tokio::test(start_paused = true)]
async fn concurrency_never_exceeds_capacity() {
    let throttle = ConcurrencyThrottle::new(3, Duration::from_secs(10)).unwrap();
    let current = AtomicUsize::new(0);
    let peak = AtomicUsize::new(0);

    let calls = (0..12).map(|_| {
        throttle.execute(|| async {
            let now = current.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            sleep(Duration::from_millis(10)).await;
            current.fetch_sub(1, Ordering::SeqCst);
            Ok::<_, ()>(())
        })
    });
    let results = join_all(calls).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(peak.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn waiting_caller_gives_up_after_timeout() {
    let throttle = ConcurrencyThrottle::new(1, Duration::from_millis(50)).unwrap();

    let slow = throttle.execute(|| async {
        sleep(Duration::from_millis(200)).await;
        Ok::<_, ()>("slow")
    });
    let impatient = async {
        tokio::task::yield_now().await;
        throttle.execute(|| async { Ok::<_, ()>("fast") }).await
    };

    let (slow, impatient) = tokio::join!(slow, impatient);
    assert_eq!(slow.unwrap(), "slow");
    let rejection = impatient.unwrap_err();
    assert!(rejection.is_throttled());
    assert!(rejection
        .rejection()
        .unwrap()
        .to_string()
        .contains("is full"));
}

#[tokio::test(start_paused = true)]
async fn permit_is_returned_when_action_fails() {
    let throttle = ConcurrencyThrottle::new(1, Duration::ZERO).unwrap();
    for _ in 0..5 {
        let err = throttle
            .execute(|| async { Err::<(), _>("bad gateway") })
            .await
            .unwrap_err();
        assert_eq!(err.into_inner(), Some("bad gateway"));
    }
    assert_eq!(throttle.available_permits(), 1);
}

#[tokio::test(start_paused = true)]
async fn dispose_rejects_new_and_waiting_callers() {
    let throttle = ConcurrencyThrottle::new(1, Duration::from_secs(60)).unwrap();
    let (release, held) = tokio::sync::oneshot::channel::<()>();

    let running = throttle.execute(|| async {
        let _ = held.await;
        Ok::<_, ()>("finished")
    });
    let waiting = async {
        tokio::task::yield_now().await;
        let waiter = throttle.execute(|| async { Ok::<_, ()>("never") });
        let disposer = async {
            tokio::task::yield_now().await;
            throttle.dispose();
            let _ = release.send(());
        };
        let (result, ()) = tokio::join!(waiter, disposer);
        result
    };

    let (running, waiting) = tokio::join!(running, waiting);
    assert_eq!(running.unwrap(), "finished");
    assert!(waiting.unwrap_err().is_disposed());
    assert!(throttle.is_disposed());
    assert!(throttle
        .execute(|| async { Ok::<_, ()>(()) })
        .await
        .unwrap_err()
        .is_disposed());
}

#[test]
fn capacity_is_validated() {
    assert!(ConcurrencyThrottle::new(0, Duration::ZERO).is_err());
    let throttle = ConcurrencyThrottle::new(usize::MAX, Duration::ZERO).unwrap();
    assert_eq!(
        throttle.max_concurrent_requests(),
        tokio::sync::Semaphore::MAX_PERMITS
    );
}
