use guardrail::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::{service_fn, Layer, Service, ServiceBuilder, ServiceExt};

#[tokio::test]
async fn layer_applies_chain_to_service() {
    let hits = Arc::new(AtomicUsize::new(0));
    let h = Arc::clone(&hits);
    let backend = service_fn(move |req: u32| {
        h.fetch_add(1, Ordering::SeqCst);
        async move {
            if req == 0 {
                Err("zero")
            } else {
                Ok(req * 2)
            }
        }
    });

    let breaker = CircuitBreaker::new(1, Duration::from_secs(60)).unwrap();
    let chain = GuardChainBuilder::new()
        .add(breaker.clone())
        .unwrap()
        .build_with(ConcurrencyThrottle::new(4, Duration::ZERO).unwrap())
        .unwrap();
    let mut svc = GuardLayer::new(chain).layer(backend);

    assert_eq!(svc.ready().await.unwrap().call(21).await.unwrap(), 42);

    let err = svc.ready().await.unwrap().call(0).await.unwrap_err();
    assert_eq!(err, GuardError::Inner("zero"));
    assert_eq!(breaker.state(), CircuitState::Open);

    let err = svc.ready().await.unwrap().call(5).await.unwrap_err();
    assert!(err.is_circuit_open());
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn layer_works_in_service_builder() {
    let barrier = FlowRateBarrier::builder()
        .max_requests_per_interval(2)
        .reset_interval(Duration::from_secs(60))
        .window_limit(WindowLimit::Strict)
        .build()
        .unwrap();

    let mut svc = ServiceBuilder::new()
        .layer(GuardLayer::new(barrier))
        .service(service_fn(|name: &'static str| async move {
            Ok::<_, std::convert::Infallible>(format!("hello {name}"))
        }));

    assert_eq!(svc.ready().await.unwrap().call("a").await.unwrap(), "hello a");
    assert_eq!(svc.ready().await.unwrap().call("b").await.unwrap(), "hello b");
    assert!(svc
        .ready()
        .await
        .unwrap()
        .call("c")
        .await
        .unwrap_err()
        .is_flow_rate_exceeded());
}
