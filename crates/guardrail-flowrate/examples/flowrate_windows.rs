//! Fixed windows in action.
//!
//! A client fires a request every 40ms at a barrier allowing 3 calls per
//! 200ms window. The output shows which calls pass and where windows reset.
//!
//! Run with:
//! ```sh
//! cargo run -p guardrail-flowrate --example flowrate_windows
//! ```

use guardrail_core::{GuardError, GuardExt};
use guardrail_flowrate::{FlowRateBarrier, WindowLimit};
use std::time::Duration;

#[tokio::main]
async fn main() {
    let barrier = FlowRateBarrier::builder()
        .name("geocoder")
        .max_requests_per_interval(3)
        .reset_interval(Duration::from_millis(200))
        .window_limit(WindowLimit::Strict)
        .on_window_reset(|previous| println!("-- window reset ({previous} calls admitted) --"))
        .build()
        .expect("valid configuration");

    for i in 0..15 {
        let outcome = barrier
            .execute(|| async move { Ok::<_, std::io::Error>(i * 10) })
            .await;
        match outcome {
            Ok(v) => println!("request {i:>2}: admitted -> {v}"),
            Err(GuardError::Rejected(r)) => println!("request {i:>2}: {r}"),
            Err(GuardError::Inner(e)) => println!("request {i:>2}: failed: {e}"),
        }
        tokio::time::sleep(Duration::from_millis(40)).await;
    }
}
