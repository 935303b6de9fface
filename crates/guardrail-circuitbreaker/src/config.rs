use crate::events::CircuitBreakerEvent;
use crate::{CircuitBreaker, CircuitState};
use guardrail_core::{ConfigError, EventListeners, FnListener};
use std::time::Duration;

/// Configuration for a circuit breaker.
pub struct CircuitBreakerConfig {
    pub(crate) threshold: usize,
    pub(crate) reset_interval: Duration,
    pub(crate) auto_reset: bool,
    pub(crate) event_listeners: EventListeners<CircuitBreakerEvent>,
    pub(crate) name: String,
}

impl CircuitBreakerConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Failures needed to trip the circuit.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// How long the circuit stays open before probing.
    pub fn reset_interval(&self) -> Duration {
        self.reset_interval
    }

    /// Name used in rejections, logs and metrics.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for CircuitBreakerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreakerConfig")
            .field("name", &self.name)
            .field("threshold", &self.threshold)
            .field("reset_interval", &self.reset_interval)
            .field("auto_reset", &self.auto_reset)
            .field("event_listeners", &self.event_listeners)
            .finish()
    }
}

/// Builder for configuring and constructing a circuit breaker.
pub struct CircuitBreakerConfigBuilder {
    threshold: usize,
    reset_interval: Duration,
    auto_reset: bool,
    event_listeners: EventListeners<CircuitBreakerEvent>,
    name: String,
}

impl CircuitBreakerConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            threshold: 5,
            reset_interval: Duration::from_secs(30),
            auto_reset: true,
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Sets how many failures trip the circuit.
    ///
    /// Each success while closed takes one failure back, so this is not a
    /// count of consecutive failures.
    ///
    /// Default: 5
    pub fn threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sets how long the circuit stays open before admitting a probe.
    ///
    /// Default: 30 seconds
    pub fn reset_interval(mut self, interval: Duration) -> Self {
        self.reset_interval = interval;
        self
    }

    /// Sets whether the circuit moves to half-open by itself once
    /// `reset_interval` has elapsed. Without it only
    /// [`CircuitBreaker::reset`] closes an open circuit.
    ///
    /// Default: true
    pub fn auto_reset(mut self, enabled: bool) -> Self {
        self.auto_reset = enabled;
        self
    }

    /// Give this breaker a human-readable name for observability.
    ///
    /// Default: `<unnamed>`
    pub fn name<N: Into<String>>(mut self, n: N) -> Self {
        self.name = n.into();
        self
    }

    /// Registers a callback when the circuit breaker transitions between states.
    ///
    /// # Callback Signature
    /// `Fn(CircuitState, CircuitState)`, called with the state the circuit
    /// leaves and the state it enters.
    ///
    /// # Example
    /// ```rust
    /// use guardrail_circuitbreaker::{CircuitBreaker, CircuitState};
    ///
    /// let breaker = CircuitBreaker::builder()
    ///     .threshold(3)
    ///     .on_state_transition(|from, to| {
    ///         if to == CircuitState::Open {
    ///             eprintln!("circuit opened (was {from})");
    ///         }
    ///     })
    ///     .build()
    ///     .unwrap();
    /// # let _ = breaker;
    /// ```
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::StateTransition {
                    from_state,
                    to_state,
                    ..
                } = event
                {
                    f(*from_state, *to_state);
                }
            }));
        self
    }

    /// Registers a callback when a call is admitted, with the state it was
    /// admitted in.
    pub fn on_call_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::CallPermitted { state, .. } = event {
                    f(*state);
                }
            }));
        self
    }

    /// Registers a callback when a call is rejected.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if matches!(event, CircuitBreakerEvent::CallRejected { .. }) {
                    f();
                }
            }));
        self
    }

    /// Registers a callback when a successful call is recorded, with its duration.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::SuccessRecorded { duration, .. } = event {
                    f(*duration);
                }
            }));
        self
    }

    /// Registers a callback when a failed call is recorded, with its duration.
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::FailureRecorded { duration, .. } = event {
                    f(*duration);
                }
            }));
        self
    }

    /// Validates the configuration and builds the circuit breaker.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidThreshold`] for a threshold of zero and
    /// [`ConfigError::ZeroInterval`] for a zero reset interval.
    pub fn build(self) -> Result<CircuitBreaker, ConfigError> {
        if self.threshold == 0 {
            return Err(ConfigError::InvalidThreshold(self.threshold));
        }
        if self.reset_interval.is_zero() {
            return Err(ConfigError::ZeroInterval {
                field: "reset_interval",
            });
        }

        Ok(CircuitBreaker::from_config(CircuitBreakerConfig {
            threshold: self.threshold,
            reset_interval: self.reset_interval,
            auto_reset: self.auto_reset,
            event_listeners: self.event_listeners,
            name: self.name,
        }))
    }
}

impl Default for CircuitBreakerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
