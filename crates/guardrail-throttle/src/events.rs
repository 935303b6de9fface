//! Events emitted by the concurrency throttle.

use guardrail_core::GuardEvent;
use std::time::{Duration, Instant};

/// Events emitted by a [`ConcurrencyThrottle`](crate::ConcurrencyThrottle).
#[derive(Debug, Clone)]
pub enum ThrottleEvent {
    /// A call acquired a permit.
    CallPermitted {
        /// Name of the throttle instance.
        guard_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Number of calls holding a permit, including this one.
        concurrent_calls: usize,
        /// How long the call waited for its permit.
        waited: Duration,
    },
    /// A call gave up waiting for a permit.
    CallRejected {
        /// Name of the throttle instance.
        guard_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Configured capacity.
        max_concurrent_requests: usize,
    },
    /// An admitted call succeeded and released its permit.
    CallFinished {
        /// Name of the throttle instance.
        guard_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Time spent holding the permit.
        duration: Duration,
    },
    /// An admitted call returned an error and released its permit.
    CallFailed {
        /// Name of the throttle instance.
        guard_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Time spent holding the permit.
        duration: Duration,
    },
}

impl GuardEvent for ThrottleEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ThrottleEvent::CallPermitted { .. } => "call_permitted",
            ThrottleEvent::CallRejected { .. } => "call_rejected",
            ThrottleEvent::CallFinished { .. } => "call_finished",
            ThrottleEvent::CallFailed { .. } => "call_failed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            ThrottleEvent::CallPermitted { timestamp, .. }
            | ThrottleEvent::CallRejected { timestamp, .. }
            | ThrottleEvent::CallFinished { timestamp, .. }
            | ThrottleEvent::CallFailed { timestamp, .. } => *timestamp,
        }
    }

    fn guard_name(&self) -> &str {
        match self {
            ThrottleEvent::CallPermitted { guard_name, .. }
            | ThrottleEvent::CallRejected { guard_name, .. }
            | ThrottleEvent::CallFinished { guard_name, .. }
            | ThrottleEvent::CallFailed { guard_name, .. } => guard_name,
        }
    }
}
