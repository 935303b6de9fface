//! Configuration for the concurrency throttle.

use crate::events::ThrottleEvent;
use crate::ConcurrencyThrottle;
use guardrail_core::events::{EventListeners, FnListener};
use guardrail_core::ConfigError;
use std::time::Duration;

/// Configuration for a concurrency throttle.
#[derive(Clone)]
pub struct ThrottleConfig {
    /// Maximum number of calls running at once.
    pub(crate) max_concurrent_requests: usize,
    /// Maximum time to wait for a permit.
    pub(crate) timeout: Duration,
    /// Name of this throttle instance.
    pub(crate) name: String,
    /// Event listeners.
    pub(crate) event_listeners: EventListeners<ThrottleEvent>,
}

impl ThrottleConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ThrottleConfigBuilder {
        ThrottleConfigBuilder::new()
    }
}

/// Builder for throttle configuration.
pub struct ThrottleConfigBuilder {
    max_concurrent_requests: usize,
    timeout: Duration,
    name: String,
    event_listeners: EventListeners<ThrottleEvent>,
}

impl ThrottleConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            max_concurrent_requests: 25,
            timeout: Duration::ZERO,
            name: "throttle".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the maximum number of concurrent calls.
    ///
    /// Default: 25
    pub fn max_concurrent_requests(mut self, max: usize) -> Self {
        self.max_concurrent_requests = max;
        self
    }

    /// Sets the maximum time to wait for a permit.
    ///
    /// A zero timeout admits a call only if a permit is free right away.
    ///
    /// Default: zero
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the name of this throttle instance.
    ///
    /// Default: "throttle"
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback when a call acquires a permit.
    ///
    /// # Callback Signature
    /// `Fn(usize)` - Called with the number of calls holding a permit,
    /// including this one.
    ///
    /// # Example
    /// ```rust
    /// use guardrail_throttle::ConcurrencyThrottle;
    ///
    /// let throttle = ConcurrencyThrottle::builder()
    ///     .max_concurrent_requests(10)
    ///     .on_call_permitted(|concurrent| {
    ///         if concurrent >= 8 {
    ///             println!("approaching capacity: {concurrent} in flight");
    ///         }
    ///     })
    ///     .build()
    ///     .unwrap();
    /// # let _ = throttle;
    /// ```
    pub fn on_call_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let ThrottleEvent::CallPermitted {
                concurrent_calls, ..
            } = event
            {
                f(*concurrent_calls);
            }
        }));
        self
    }

    /// Registers a callback when a call times out waiting for a permit.
    ///
    /// # Callback Signature
    /// `Fn(usize)` - Called with the configured capacity.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let ThrottleEvent::CallRejected {
                max_concurrent_requests,
                ..
            } = event
            {
                f(*max_concurrent_requests);
            }
        }));
        self
    }

    /// Registers a callback when an admitted call succeeds.
    ///
    /// # Callback Signature
    /// `Fn(Duration)` - Called with the time the call held its permit.
    pub fn on_call_finished<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let ThrottleEvent::CallFinished { duration, .. } = event {
                f(*duration);
            }
        }));
        self
    }

    /// Registers a callback when an admitted call returns an error.
    ///
    /// # Callback Signature
    /// `Fn(Duration)` - Called with the time the call held its permit.
    pub fn on_call_failed<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let ThrottleEvent::CallFailed { duration, .. } = event {
                f(*duration);
            }
        }));
        self
    }

    /// Validates the configuration and builds the throttle.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ZeroCapacity`] when `max_concurrent_requests` is zero.
    pub fn build(self) -> Result<ConcurrencyThrottle, ConfigError> {
        if self.max_concurrent_requests == 0 {
            return Err(ConfigError::ZeroCapacity {
                field: "max_concurrent_requests",
            });
        }

        Ok(ConcurrencyThrottle::from_config(ThrottleConfig {
            max_concurrent_requests: self.max_concurrent_requests,
            timeout: self.timeout,
            name: self.name,
            event_listeners: self.event_listeners,
        }))
    }
}

impl Default for ThrottleConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
