use super::helpers::*;
use guardrail_core::GuardExt;
use guardrail_flowrate::{FlowRateBarrier, WindowLimit};
use serial_test::serial;
use std::time::Duration;

#[tokio::test(start_paused = true)]
#[serial]
async fn flowrate_metrics_exist() {
    init_recorder();

    let barrier = FlowRateBarrier::builder()
        .name("metrics_flowrate")
        .max_requests_per_interval(1)
        .reset_interval(Duration::from_millis(50))
        .window_limit(WindowLimit::Strict)
        .build()
        .unwrap();

    barrier.execute(|| async { Ok::<_, ()>(()) }).await.unwrap();
    barrier.execute(|| async { Ok::<_, ()>(()) }).await.unwrap_err();
    tokio::time::sleep(Duration::from_millis(50)).await;
    barrier.execute(|| async { Ok::<_, ()>(()) }).await.unwrap();

    assert_counter_exists("flowrate_calls_permitted_total");
    assert_metric_has_label("flowrate_calls_permitted_total", "flowrate", "metrics_flowrate");
    assert_counter_exists("flowrate_calls_rejected_total");
    assert_counter_exists("flowrate_window_resets_total");
    assert_gauge_exists("flowrate_window_count");
}
