use guardrail_core::GuardEvent;
use std::time::Instant;

/// Events emitted by a [`FlowRateBarrier`](crate::FlowRateBarrier).
#[derive(Debug, Clone)]
pub enum FlowRateEvent {
    /// A call was admitted in the current window.
    CallPermitted {
        guard_name: String,
        timestamp: Instant,
        /// Admissions in the current window, including this one.
        count: usize,
    },
    /// A call was refused because the window is used up.
    CallRejected {
        guard_name: String,
        timestamp: Instant,
        max_requests_per_interval: usize,
    },
    /// A window boundary passed and the counter went back to zero.
    WindowReset {
        guard_name: String,
        timestamp: Instant,
        /// Admissions counted in the window that just ended.
        previous_count: usize,
    },
}

impl GuardEvent for FlowRateEvent {
    fn event_type(&self) -> &'static str {
        match self {
            FlowRateEvent::CallPermitted { .. } => "call_permitted",
            FlowRateEvent::CallRejected { .. } => "call_rejected",
            FlowRateEvent::WindowReset { .. } => "window_reset",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            FlowRateEvent::CallPermitted { timestamp, .. }
            | FlowRateEvent::CallRejected { timestamp, .. }
            | FlowRateEvent::WindowReset { timestamp, .. } => *timestamp,
        }
    }

    fn guard_name(&self) -> &str {
        match self {
            FlowRateEvent::CallPermitted { guard_name, .. }
            | FlowRateEvent::CallRejected { guard_name, .. }
            | FlowRateEvent::WindowReset { guard_name, .. } => guard_name,
        }
    }
}
