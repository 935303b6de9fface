//! Circuit breaker guard.
//!
//! A circuit breaker stops invoking an unreliable operation after it has
//! failed often enough, and probes it again once a reset interval has passed.
//!
//! ## States
//! - **Closed**: Normal operation, every call runs
//! - **Open**: Circuit is tripped, calls are rejected without running
//! - **Half-Open**: One probe call runs; its outcome closes or re-opens the circuit
//!
//! ## Failure counting
//!
//! Every failure increments the failure count (up to `threshold`), every
//! success decrements it (down to zero). The circuit trips when the count
//! reaches `threshold` while closed, or on any failure while half-open.
//! Rejections from guards nested inside the action are not failures of the
//! protected operation and are not counted.
//!
//! ## Usage
//!
//! ```rust
//! use guardrail_circuitbreaker::CircuitBreaker;
//! use guardrail_core::GuardExt;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let breaker = CircuitBreaker::builder()
//!     .name("inventory")
//!     .threshold(3)
//!     .reset_interval(Duration::from_secs(10))
//!     .build()
//!     .unwrap();
//!
//! let stock = breaker
//!     .execute(|| async { Ok::<_, std::io::Error>(12) })
//!     .await;
//! assert_eq!(stock.unwrap(), 12);
//! # }
//! ```
//!
//! ## Reset timer
//!
//! When the circuit trips inside a tokio runtime, a timer task moves it to
//! half-open after `reset_interval`. Outside a runtime the same transition
//! happens on the next call or state read once the interval has elapsed.
//!
//! ## Observability
//!
//! - Event listeners via the `on_*` builder hooks
//! - `tracing` events with the `tracing` feature
//! - `metrics` counters and gauges with the `metrics` feature

use crate::circuit::{Admission, Circuit, Effect, Signal, Transition};
use futures::future::FutureExt;
use guardrail_core::{lock, Action, ActionFuture, ConfigError, Guard, GuardError, Rejection};
#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(feature = "metrics")]
use std::sync::Once;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
#[cfg(feature = "tracing")]
use tracing::{debug, info, warn};

pub use circuit::{CircuitMetrics, CircuitState};
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
pub use events::CircuitBreakerEvent;

mod circuit;
mod config;
mod events;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

/// A circuit breaker guard.
///
/// Cheap to clone: clones share the same circuit.
#[derive(Clone)]
pub struct CircuitBreaker {
    shared: Arc<Shared>,
}

struct Shared {
    config: CircuitBreakerConfig,
    auto_reset: AtomicBool,
    disposed: AtomicBool,
    inner: Mutex<Inner>,
}

struct Inner {
    circuit: Circuit,
    timer: Option<JoinHandle<()>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Success,
    Failure,
}

impl CircuitBreaker {
    /// Returns a new builder.
    pub fn builder() -> CircuitBreakerConfigBuilder {
        #[cfg(feature = "metrics")]
        {
            METRICS_INIT.call_once(|| {
                describe_counter!(
                    "circuitbreaker_calls_total",
                    "Total number of calls through the circuit breaker"
                );
                describe_counter!(
                    "circuitbreaker_transitions_total",
                    "Total number of circuit breaker state transitions"
                );
                describe_gauge!(
                    "circuitbreaker_state",
                    "Current state of the circuit breaker (0=closed, 1=open, 2=half_open)"
                );
                describe_gauge!(
                    "circuitbreaker_failure_count",
                    "Current failure count of the circuit breaker"
                );
                describe_histogram!(
                    "circuitbreaker_call_duration_seconds",
                    "Duration of calls admitted by the circuit breaker"
                );
            });
        }
        CircuitBreakerConfigBuilder::new()
    }

    /// Creates a circuit breaker with the given threshold and reset interval.
    pub fn new(threshold: usize, reset_interval: Duration) -> Result<Self, ConfigError> {
        Self::builder()
            .threshold(threshold)
            .reset_interval(reset_interval)
            .build()
    }

    pub(crate) fn from_config(config: CircuitBreakerConfig) -> Self {
        let circuit = Circuit::new(config.threshold, config.reset_interval, Instant::now());
        Self {
            shared: Arc::new(Shared {
                auto_reset: AtomicBool::new(config.auto_reset),
                disposed: AtomicBool::new(false),
                inner: Mutex::new(Inner {
                    circuit,
                    timer: None,
                }),
                config,
            }),
        }
    }

    /// Name used in rejections, logs and metrics.
    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    /// Failures needed to trip the circuit.
    pub fn threshold(&self) -> usize {
        self.shared.config.threshold
    }

    /// How long the circuit stays open before probing.
    pub fn reset_interval(&self) -> Duration {
        self.shared.config.reset_interval
    }

    /// Returns the current state.
    pub fn state(&self) -> CircuitState {
        self.shared.read(|circuit| circuit.state())
    }

    /// Returns the current failure count.
    pub fn failure_count(&self) -> usize {
        self.shared.read(|circuit| circuit.failure_count())
    }

    /// Returns `true` unless the circuit is open or the breaker was disposed.
    pub fn can_execute(&self) -> bool {
        !self.is_disposed() && self.state() != CircuitState::Open
    }

    /// Health as a percentage: 100 with no recorded failures, 0 at the threshold.
    pub fn current_service_level(&self) -> f64 {
        self.shared.read(|circuit| circuit.service_level())
    }

    /// Returns a consistent snapshot of the breaker.
    pub fn metrics(&self) -> CircuitMetrics {
        let auto_reset = self.auto_reset();
        self.shared
            .read(|circuit| circuit.metrics(auto_reset, Instant::now()))
    }

    /// Whether an open circuit moves to half-open by itself.
    pub fn auto_reset(&self) -> bool {
        self.shared.auto_reset.load(Ordering::Acquire)
    }

    /// Enables or disables the automatic open to half-open transition.
    ///
    /// Disabling does not cancel an armed timer, but its signal is then
    /// ignored. Enabling while the circuit is open takes effect on the next
    /// call or state read.
    pub fn set_auto_reset(&self, enabled: bool) {
        self.shared.auto_reset.store(enabled, Ordering::Release);
    }

    /// Forces the circuit closed with a zero failure count.
    ///
    /// Cancels a pending reset timer. A probe in flight when this is called
    /// no longer holds the half-open slot.
    pub fn reset(&self) {
        self.shared.signal(Signal::Reset);
    }

    /// Permanently stops admitting calls and releases the reset timer.
    pub fn dispose(&self) {
        if self.shared.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(timer) = lock(&self.shared.inner).timer.take() {
            timer.abort();
        }

        #[cfg(feature = "tracing")]
        debug!(breaker = %self.name(), "circuit breaker disposed");
    }

    /// Returns `true` once [`dispose`](Self::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name())
            .field("state", &self.state())
            .field("failure_count", &self.failure_count())
            .field("threshold", &self.threshold())
            .finish()
    }
}

impl Guard for CircuitBreaker {
    fn name(&self) -> &str {
        &self.shared.config.name
    }

    fn run<'a>(&'a self, action: Action<'a>) -> ActionFuture<'a> {
        async move {
            let permit = self.shared.acquire()?;
            let result = action().await;
            match &result {
                Ok(()) => permit.record(Outcome::Success),
                Err(GuardError::Inner(_)) => permit.record(Outcome::Failure),
                // Rejected by a nested guard: the protected operation never ran.
                Err(GuardError::Rejected(_)) => drop(permit),
            }
            result
        }
        .boxed()
    }
}

impl Shared {
    fn read<T>(self: &Arc<Self>, f: impl FnOnce(&Circuit) -> T) -> T {
        let auto_reset = self.auto_reset.load(Ordering::Acquire);
        let (value, transition) = {
            let mut inner = lock(&self.inner);
            let transition = inner.circuit.refresh(auto_reset, Instant::now());
            (f(&inner.circuit), transition)
        };
        self.publish(transition);
        value
    }

    fn acquire(self: &Arc<Self>) -> Result<CallPermit, Rejection> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(Rejection::Disposed {
                name: self.config.name.clone(),
            });
        }

        let auto_reset = self.auto_reset.load(Ordering::Acquire);
        let (admission, state, transition) = {
            let mut inner = lock(&self.inner);
            let transition = inner.circuit.refresh(auto_reset, Instant::now());
            let admission = inner.circuit.admit();
            (admission, inner.circuit.state(), transition)
        };
        self.publish(transition);

        if admission == Admission::Rejected {
            self.config
                .event_listeners
                .emit(&CircuitBreakerEvent::CallRejected {
                    guard_name: self.config.name.clone(),
                    timestamp: std::time::Instant::now(),
                    state,
                });

            #[cfg(feature = "tracing")]
            debug!(breaker = %self.config.name, %state, "call rejected: circuit open");

            #[cfg(feature = "metrics")]
            counter!(
                "circuitbreaker_calls_total",
                "circuitbreaker" => self.config.name.clone(),
                "outcome" => "rejected"
            )
            .increment(1);

            return Err(Rejection::CircuitOpen {
                name: self.config.name.clone(),
            });
        }

        self.config
            .event_listeners
            .emit(&CircuitBreakerEvent::CallPermitted {
                guard_name: self.config.name.clone(),
                timestamp: std::time::Instant::now(),
                state,
            });

        #[cfg(feature = "tracing")]
        if let Admission::Probe { .. } = admission {
            debug!(breaker = %self.config.name, "admitting half-open probe");
        }

        Ok(CallPermit {
            shared: Arc::clone(self),
            admission,
            started: Instant::now(),
            recorded: false,
        })
    }

    fn signal(self: &Arc<Self>, signal: Signal) -> usize {
        let auto_reset = self.auto_reset.load(Ordering::Acquire);
        let (transition, failure_count) = {
            let mut inner = lock(&self.inner);
            let step = inner.circuit.apply(signal, auto_reset, Instant::now());
            match step.effect {
                Effect::ArmResetTimer { generation } => {
                    if let Some(previous) = inner.timer.take() {
                        previous.abort();
                    }
                    inner.timer = self.arm_reset_timer(generation);
                }
                Effect::CancelResetTimer => {
                    if let Some(timer) = inner.timer.take() {
                        timer.abort();
                    }
                }
                Effect::None => {}
            }
            (step.transition, inner.circuit.failure_count())
        };

        #[cfg(feature = "metrics")]
        gauge!("circuitbreaker_failure_count", "circuitbreaker" => self.config.name.clone())
            .set(failure_count as f64);

        self.publish(transition);
        failure_count
    }

    fn arm_reset_timer(self: &Arc<Self>, generation: u64) -> Option<JoinHandle<()>> {
        if self.disposed.load(Ordering::Acquire) {
            return None;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            #[cfg(feature = "tracing")]
            debug!(breaker = %self.config.name, "no runtime, reset checked lazily");
            return None;
        };

        let weak: Weak<Shared> = Arc::downgrade(self);
        let interval = self.config.reset_interval;
        Some(handle.spawn(async move {
            tokio::time::sleep(interval).await;
            if let Some(shared) = weak.upgrade() {
                shared.signal(Signal::ResetElapsed { generation });
            }
        }))
    }

    fn publish(&self, transition: Option<Transition>) {
        let Some(Transition { from, to }) = transition else {
            return;
        };

        #[cfg(feature = "tracing")]
        match to {
            CircuitState::Open => {
                warn!(breaker = %self.config.name, from = %from, to = %to, "circuit opened")
            }
            _ => info!(breaker = %self.config.name, from = %from, to = %to, "circuit state transition"),
        }

        #[cfg(feature = "metrics")]
        {
            counter!(
                "circuitbreaker_transitions_total",
                "circuitbreaker" => self.config.name.clone(),
                "from" => from.as_str(),
                "to" => to.as_str()
            )
            .increment(1);
            gauge!("circuitbreaker_state", "circuitbreaker" => self.config.name.clone())
                .set(to as u8 as f64);
        }

        self.config
            .event_listeners
            .emit(&CircuitBreakerEvent::StateTransition {
                guard_name: self.config.name.clone(),
                timestamp: std::time::Instant::now(),
                from_state: from,
                to_state: to,
            });
    }
}

/// An admitted call. Dropping it without recording an outcome (the caller's
/// future was cancelled or the action panicked) counts nothing and frees the
/// half-open probe slot.
struct CallPermit {
    shared: Arc<Shared>,
    admission: Admission,
    started: Instant,
    recorded: bool,
}

impl CallPermit {
    fn record(mut self, outcome: Outcome) {
        self.recorded = true;
        let duration = self.started.elapsed();
        let shared = &self.shared;
        let name = &shared.config.name;

        let failure_count = shared.signal(match outcome {
            Outcome::Success => Signal::Success,
            Outcome::Failure => Signal::Failure,
        });

        #[cfg(feature = "metrics")]
        {
            let label = match outcome {
                Outcome::Success => "success",
                Outcome::Failure => "failure",
            };
            counter!("circuitbreaker_calls_total", "circuitbreaker" => name.clone(), "outcome" => label)
                .increment(1);
            histogram!("circuitbreaker_call_duration_seconds", "circuitbreaker" => name.clone())
                .record(duration.as_secs_f64());
        }

        let event = match outcome {
            Outcome::Success => CircuitBreakerEvent::SuccessRecorded {
                guard_name: name.clone(),
                timestamp: std::time::Instant::now(),
                duration,
                failure_count,
            },
            Outcome::Failure => {
                #[cfg(feature = "tracing")]
                debug!(breaker = %name, failure_count, "failure recorded");

                CircuitBreakerEvent::FailureRecorded {
                    guard_name: name.clone(),
                    timestamp: std::time::Instant::now(),
                    duration,
                    failure_count,
                }
            }
        };
        shared.config.event_listeners.emit(&event);
    }
}

impl Drop for CallPermit {
    fn drop(&mut self) {
        if self.recorded {
            return;
        }
        if let Admission::Probe { generation } = self.admission {
            #[cfg(feature = "tracing")]
            debug!(breaker = %self.shared.config.name, "half-open probe ended without an outcome");

            self.shared.signal(Signal::ProbeAbandoned { generation });
        }
    }
}
