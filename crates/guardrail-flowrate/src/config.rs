use crate::events::FlowRateEvent;
use crate::window::WindowLimit;
use crate::FlowRateBarrier;
use guardrail_core::events::{EventListeners, FnListener};
use guardrail_core::ConfigError;
use std::time::Duration;

/// Configuration for a flow rate barrier.
pub struct FlowRateConfig {
    pub(crate) max_requests_per_interval: usize,
    pub(crate) reset_interval: Duration,
    pub(crate) window_limit: WindowLimit,
    pub(crate) event_listeners: EventListeners<FlowRateEvent>,
    pub(crate) name: String,
}

/// Builder for [`FlowRateConfig`].
pub struct FlowRateConfigBuilder {
    max_requests_per_interval: usize,
    reset_interval: Duration,
    window_limit: WindowLimit,
    event_listeners: EventListeners<FlowRateEvent>,
    name: String,
}

impl Default for FlowRateConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowRateConfigBuilder {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - max_requests_per_interval: 50
    /// - reset_interval: 1 second
    /// - window_limit: [`WindowLimit::Lenient`]
    /// - name: `"<unnamed>"`
    pub fn new() -> Self {
        Self {
            max_requests_per_interval: 50,
            reset_interval: Duration::from_secs(1),
            window_limit: WindowLimit::Lenient,
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Sets the number of admissions per window.
    ///
    /// With the default [`WindowLimit::Lenient`] a window admits one call
    /// more than this.
    pub fn max_requests_per_interval(mut self, max: usize) -> Self {
        self.max_requests_per_interval = max;
        self
    }

    /// Sets the window length. The counter goes back to zero at every
    /// multiple of this interval after the barrier was built.
    pub fn reset_interval(mut self, interval: Duration) -> Self {
        self.reset_interval = interval;
        self
    }

    /// Sets how the window limit relates to `max_requests_per_interval`.
    pub fn window_limit(mut self, limit: WindowLimit) -> Self {
        self.window_limit = limit;
        self
    }

    /// Sets the name for this barrier (used in rejections, events and metrics).
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback when a call is admitted.
    ///
    /// # Callback Signature
    /// `Fn(usize)` - Called with the window count after this admission.
    pub fn on_call_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let FlowRateEvent::CallPermitted { count, .. } = event {
                f(*count);
            }
        }));
        self
    }

    /// Registers a callback when a call is refused.
    ///
    /// # Example
    /// ```rust
    /// use guardrail_flowrate::FlowRateBarrier;
    /// use std::time::Duration;
    ///
    /// let barrier = FlowRateBarrier::builder()
    ///     .max_requests_per_interval(100)
    ///     .reset_interval(Duration::from_secs(1))
    ///     .on_call_rejected(|max| eprintln!("over {max} calls this second"))
    ///     .build()
    ///     .unwrap();
    /// # let _ = barrier;
    /// ```
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let FlowRateEvent::CallRejected {
                max_requests_per_interval,
                ..
            } = event
            {
                f(*max_requests_per_interval);
            }
        }));
        self
    }

    /// Registers a callback when the window resets.
    ///
    /// # Callback Signature
    /// `Fn(usize)` - Called with the count of the window that just ended.
    pub fn on_window_reset<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let FlowRateEvent::WindowReset { previous_count, .. } = event {
                f(*previous_count);
            }
        }));
        self
    }

    /// Validates the configuration and builds the barrier.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ZeroCapacity`] for a zero maximum and
    /// [`ConfigError::ZeroInterval`] for a zero reset interval.
    pub fn build(self) -> Result<FlowRateBarrier, ConfigError> {
        if self.max_requests_per_interval == 0 {
            return Err(ConfigError::ZeroCapacity {
                field: "max_requests_per_interval",
            });
        }
        if self.reset_interval.is_zero() {
            return Err(ConfigError::ZeroInterval {
                field: "reset_interval",
            });
        }

        Ok(FlowRateBarrier::from_config(FlowRateConfig {
            max_requests_per_interval: self.max_requests_per_interval,
            reset_interval: self.reset_interval,
            window_limit: self.window_limit,
            event_listeners: self.event_listeners,
            name: self.name,
        }))
    }
}
