//! Fixed-window flow rate barrier.
//!
//! A barrier admits at most a fixed number of calls per window and resets its
//! counter at every window boundary, whether or not calls arrive. Windows are
//! fixed, not sliding: a burst at the end of one window and another at the
//! start of the next are both admitted.
//!
//! # Window limit
//!
//! By default a window admits calls while its count is at most
//! `max_requests_per_interval`, i.e. `max + 1` calls. Use
//! [`WindowLimit::Strict`] to admit exactly `max`.
//!
//! # Examples
//!
//! ```
//! use guardrail_core::GuardExt;
//! use guardrail_flowrate::{FlowRateBarrier, WindowLimit};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let barrier = FlowRateBarrier::builder()
//!     .name("search-api")
//!     .max_requests_per_interval(2)
//!     .reset_interval(Duration::from_secs(1))
//!     .window_limit(WindowLimit::Strict)
//!     .build()
//!     .unwrap();
//!
//! for _ in 0..2 {
//!     barrier.execute(|| async { Ok::<_, ()>(()) }).await.unwrap();
//! }
//! let third = barrier.execute(|| async { Ok::<_, ()>(()) }).await;
//! assert!(third.unwrap_err().is_flow_rate_exceeded());
//! # }
//! ```

mod config;
mod events;
mod window;

pub use config::{FlowRateConfig, FlowRateConfigBuilder};
pub use events::FlowRateEvent;
pub use window::WindowLimit;

use crate::window::FixedWindow;
use futures::future::FutureExt;
use guardrail_core::{lock, Action, ActionFuture, ConfigError, Guard, Rejection};
#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_gauge, gauge};
use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(feature = "metrics")]
use std::sync::Once;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
#[cfg(feature = "tracing")]
use tracing::{debug, trace};

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

/// A guard admitting a bounded number of calls per fixed time window.
///
/// Cheap to clone: clones share the same window.
#[derive(Clone)]
pub struct FlowRateBarrier {
    config: Arc<FlowRateConfig>,
    window: Arc<Mutex<FixedWindow>>,
    disposed: Arc<AtomicBool>,
}

impl FlowRateBarrier {
    /// Creates a new builder.
    pub fn builder() -> FlowRateConfigBuilder {
        #[cfg(feature = "metrics")]
        {
            METRICS_INIT.call_once(|| {
                describe_counter!(
                    "flowrate_calls_permitted_total",
                    "Total number of calls admitted by the flow rate barrier"
                );
                describe_counter!(
                    "flowrate_calls_rejected_total",
                    "Total number of calls refused by the flow rate barrier"
                );
                describe_counter!(
                    "flowrate_window_resets_total",
                    "Total number of window resets"
                );
                describe_gauge!(
                    "flowrate_window_count",
                    "Admissions counted in the current window"
                );
            });
        }
        FlowRateConfigBuilder::new()
    }

    /// Creates a barrier admitting `max_requests_per_interval` calls (plus
    /// one, see [`WindowLimit::Lenient`]) per `reset_interval`.
    pub fn new(max_requests_per_interval: usize, reset_interval: Duration) -> Result<Self, ConfigError> {
        Self::builder()
            .max_requests_per_interval(max_requests_per_interval)
            .reset_interval(reset_interval)
            .build()
    }

    pub(crate) fn from_config(config: FlowRateConfig) -> Self {
        let window = FixedWindow::new(
            config.max_requests_per_interval,
            config.reset_interval,
            config.window_limit,
            Instant::now(),
        );
        Self {
            config: Arc::new(config),
            window: Arc::new(Mutex::new(window)),
            disposed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Name used in rejections, logs and metrics.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Configured admissions per window.
    pub fn max_requests_per_interval(&self) -> usize {
        self.config.max_requests_per_interval
    }

    /// Window length.
    pub fn reset_interval(&self) -> Duration {
        self.config.reset_interval
    }

    /// How the window limit relates to `max_requests_per_interval`.
    pub fn window_limit(&self) -> WindowLimit {
        self.config.window_limit
    }

    /// Returns `true` if a call made now would be admitted.
    pub fn can_execute(&self) -> bool {
        !self.is_disposed() && self.with_window(|window| window.has_room())
    }

    /// Admissions counted in the current window.
    pub fn current_count(&self) -> usize {
        self.with_window(|window| window.count())
    }

    /// Time left until the counter resets.
    pub fn time_until_reset(&self) -> Duration {
        let now = Instant::now();
        self.with_window(|window| window.next_boundary().saturating_duration_since(now))
    }

    /// Stops admitting calls.
    pub fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            #[cfg(feature = "tracing")]
            debug!(barrier = %self.config.name, "flow rate barrier disposed");
        }
    }

    /// Returns `true` once [`dispose`](Self::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn with_window<T>(&self, f: impl FnOnce(&mut FixedWindow) -> T) -> T {
        let (value, reset) = {
            let mut window = lock(&self.window);
            let reset = window.roll(Instant::now());
            (f(&mut window), reset)
        };
        if let Some(previous_count) = reset {
            self.window_reset(previous_count);
        }
        value
    }

    fn window_reset(&self, previous_count: usize) {
        #[cfg(feature = "tracing")]
        trace!(barrier = %self.config.name, previous_count, "window reset");

        #[cfg(feature = "metrics")]
        {
            counter!("flowrate_window_resets_total", "flowrate" => self.config.name.clone())
                .increment(1);
            gauge!("flowrate_window_count", "flowrate" => self.config.name.clone()).set(0.0);
        }

        self.config
            .event_listeners
            .emit(&FlowRateEvent::WindowReset {
                guard_name: self.config.name.clone(),
                timestamp: std::time::Instant::now(),
                previous_count,
            });
    }

    fn admit(&self) -> Result<usize, Rejection> {
        if self.is_disposed() {
            return Err(Rejection::Disposed {
                name: self.config.name.clone(),
            });
        }

        let config = &self.config;
        match self.with_window(|window| window.try_admit()) {
            Some(count) => {
                #[cfg(feature = "metrics")]
                {
                    counter!("flowrate_calls_permitted_total", "flowrate" => config.name.clone())
                        .increment(1);
                    gauge!("flowrate_window_count", "flowrate" => config.name.clone())
                        .set(count as f64);
                }

                config.event_listeners.emit(&FlowRateEvent::CallPermitted {
                    guard_name: config.name.clone(),
                    timestamp: std::time::Instant::now(),
                    count,
                });
                Ok(count)
            }
            None => {
                #[cfg(feature = "tracing")]
                debug!(
                    barrier = %config.name,
                    max = config.max_requests_per_interval,
                    "window exhausted, call rejected"
                );

                #[cfg(feature = "metrics")]
                counter!("flowrate_calls_rejected_total", "flowrate" => config.name.clone())
                    .increment(1);

                config.event_listeners.emit(&FlowRateEvent::CallRejected {
                    guard_name: config.name.clone(),
                    timestamp: std::time::Instant::now(),
                    max_requests_per_interval: config.max_requests_per_interval,
                });
                Err(Rejection::FlowRateExceeded {
                    name: config.name.clone(),
                    max_per_interval: config.max_requests_per_interval,
                    interval: config.reset_interval,
                })
            }
        }
    }
}

impl std::fmt::Debug for FlowRateBarrier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowRateBarrier")
            .field("name", &self.config.name)
            .field("max_requests_per_interval", &self.config.max_requests_per_interval)
            .field("reset_interval", &self.config.reset_interval)
            .field("window_limit", &self.config.window_limit)
            .finish()
    }
}

impl Guard for FlowRateBarrier {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn run<'a>(&'a self, action: Action<'a>) -> ActionFuture<'a> {
        async move {
            self.admit()?;
            // Admissions stay counted whatever the action returns.
            action().await
        }
        .boxed()
    }
}
