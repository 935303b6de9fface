//! Concurrency throttle implementation.

use crate::config::{ThrottleConfig, ThrottleConfigBuilder};
use crate::events::ThrottleEvent;
use futures::future::FutureExt;
use guardrail_core::{Action, ActionFuture, ConfigError, Guard, Rejection};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Semaphore, SemaphorePermit, TryAcquireError};

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
#[cfg(feature = "metrics")]
use std::sync::Once;
#[cfg(feature = "tracing")]
use tracing::{debug, warn};

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

/// Guard that bounds how many actions run at once.
///
/// Each call holds one semaphore permit while its action runs. The permit is
/// released when the action completes, fails, panics or is cancelled.
///
/// Cheap to clone: clones share the same permits.
#[derive(Clone)]
pub struct ConcurrencyThrottle {
    semaphore: Arc<Semaphore>,
    config: Arc<ThrottleConfig>,
}

enum Denied {
    TimedOut,
    Closed,
}

impl ConcurrencyThrottle {
    /// Creates a new builder.
    ///
    /// # Examples
    ///
    /// ```
    /// use guardrail_throttle::ConcurrencyThrottle;
    /// use std::time::Duration;
    ///
    /// let throttle = ConcurrencyThrottle::builder()
    ///     .max_concurrent_requests(10)
    ///     .timeout(Duration::from_secs(5))
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(throttle.available_permits(), 10);
    /// ```
    pub fn builder() -> ThrottleConfigBuilder {
        #[cfg(feature = "metrics")]
        {
            METRICS_INIT.call_once(|| {
                describe_counter!(
                    "throttle_calls_permitted_total",
                    "Total number of calls admitted by the throttle"
                );
                describe_counter!(
                    "throttle_calls_rejected_total",
                    "Total number of calls rejected by the throttle"
                );
                describe_counter!(
                    "throttle_calls_finished_total",
                    "Total number of admitted calls that succeeded"
                );
                describe_counter!(
                    "throttle_calls_failed_total",
                    "Total number of admitted calls that returned an error"
                );
                describe_gauge!(
                    "throttle_concurrent_calls",
                    "Number of calls currently holding a permit"
                );
                describe_histogram!(
                    "throttle_wait_duration_seconds",
                    "Time spent waiting for a permit"
                );
            });
        }
        ThrottleConfigBuilder::new()
    }

    /// Creates a throttle admitting `max_concurrent_requests` calls at once,
    /// each waiting at most `timeout` for a permit.
    pub fn new(max_concurrent_requests: usize, timeout: Duration) -> Result<Self, ConfigError> {
        Self::builder()
            .max_concurrent_requests(max_concurrent_requests)
            .timeout(timeout)
            .build()
    }

    pub(crate) fn from_config(mut config: ThrottleConfig) -> Self {
        config.max_concurrent_requests = config.max_concurrent_requests.min(Semaphore::MAX_PERMITS);
        Self {
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_requests)),
            config: Arc::new(config),
        }
    }

    /// Name used in rejections, logs and metrics.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Configured capacity.
    pub fn max_concurrent_requests(&self) -> usize {
        self.config.max_concurrent_requests
    }

    /// Maximum time a call waits for a permit.
    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    /// Permits currently free.
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Calls currently holding a permit.
    pub fn concurrent_calls(&self) -> usize {
        self.config
            .max_concurrent_requests
            .saturating_sub(self.semaphore.available_permits())
    }

    /// Stops admitting calls.
    ///
    /// Callers waiting for a permit wake up and are rejected with
    /// [`Rejection::Disposed`]. Calls already running finish normally.
    pub fn dispose(&self) {
        if !self.semaphore.is_closed() {
            self.semaphore.close();

            #[cfg(feature = "tracing")]
            debug!(throttle = %self.config.name, "throttle disposed");
        }
    }

    /// Returns `true` once [`dispose`](Self::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.semaphore.is_closed()
    }

    async fn acquire(&self) -> Result<SemaphorePermit<'_>, Denied> {
        if self.config.timeout.is_zero() {
            return self.semaphore.try_acquire().map_err(|e| match e {
                TryAcquireError::NoPermits => Denied::TimedOut,
                TryAcquireError::Closed => Denied::Closed,
            });
        }

        match tokio::time::timeout(self.config.timeout, self.semaphore.acquire()).await {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(_closed)) => Err(Denied::Closed),
            Err(_elapsed) => Err(Denied::TimedOut),
        }
    }

    fn reject(&self, denied: Denied) -> Rejection {
        let name = self.config.name.clone();
        match denied {
            Denied::Closed => {
                #[cfg(feature = "metrics")]
                counter!("throttle_calls_rejected_total", "throttle" => name.clone(), "reason" => "disposed")
                    .increment(1);

                Rejection::Disposed { name }
            }
            Denied::TimedOut => {
                self.config.event_listeners.emit(&ThrottleEvent::CallRejected {
                    guard_name: name.clone(),
                    timestamp: Instant::now(),
                    max_concurrent_requests: self.config.max_concurrent_requests,
                });

                #[cfg(feature = "tracing")]
                warn!(
                    throttle = %name,
                    max_concurrent = self.config.max_concurrent_requests,
                    timeout = ?self.config.timeout,
                    "no permit available, call rejected"
                );

                #[cfg(feature = "metrics")]
                counter!("throttle_calls_rejected_total", "throttle" => name.clone(), "reason" => "timeout")
                    .increment(1);

                Rejection::Throttled {
                    name,
                    max_concurrent: self.config.max_concurrent_requests,
                    timeout: self.config.timeout,
                }
            }
        }
    }
}

impl std::fmt::Debug for ConcurrencyThrottle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrencyThrottle")
            .field("name", &self.config.name)
            .field("max_concurrent_requests", &self.config.max_concurrent_requests)
            .field("available_permits", &self.available_permits())
            .field("timeout", &self.config.timeout)
            .finish()
    }
}

impl Guard for ConcurrencyThrottle {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn run<'a>(&'a self, action: Action<'a>) -> ActionFuture<'a> {
        async move {
            let config = &self.config;
            let wait_start = Instant::now();

            let permit = match self.acquire().await {
                Ok(permit) => permit,
                Err(denied) => return Err(self.reject(denied).into()),
            };

            let waited = wait_start.elapsed();
            let concurrent_calls = self.concurrent_calls();
            config.event_listeners.emit(&ThrottleEvent::CallPermitted {
                guard_name: config.name.clone(),
                timestamp: Instant::now(),
                concurrent_calls,
                waited,
            });

            #[cfg(feature = "tracing")]
            debug!(throttle = %config.name, concurrent_calls, ?waited, "permit acquired");

            #[cfg(feature = "metrics")]
            {
                counter!("throttle_calls_permitted_total", "throttle" => config.name.clone())
                    .increment(1);
                gauge!("throttle_concurrent_calls", "throttle" => config.name.clone())
                    .set(concurrent_calls as f64);
                histogram!("throttle_wait_duration_seconds", "throttle" => config.name.clone())
                    .record(waited.as_secs_f64());
            }

            let start = Instant::now();
            let result = action().await;
            drop(permit);
            let duration = start.elapsed();

            let event = match &result {
                Ok(()) => {
                    #[cfg(feature = "metrics")]
                    counter!("throttle_calls_finished_total", "throttle" => config.name.clone())
                        .increment(1);

                    ThrottleEvent::CallFinished {
                        guard_name: config.name.clone(),
                        timestamp: Instant::now(),
                        duration,
                    }
                }
                Err(_) => {
                    #[cfg(feature = "metrics")]
                    counter!("throttle_calls_failed_total", "throttle" => config.name.clone())
                        .increment(1);

                    ThrottleEvent::CallFailed {
                        guard_name: config.name.clone(),
                        timestamp: Instant::now(),
                        duration,
                    }
                }
            };
            config.event_listeners.emit(&event);

            #[cfg(feature = "metrics")]
            gauge!("throttle_concurrent_calls", "throttle" => config.name.clone())
                .set(self.concurrent_calls() as f64);

            result
        }
        .boxed()
    }
}
