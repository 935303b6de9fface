use crate::CircuitState;
use guardrail_core::GuardEvent;
use std::time::{Duration, Instant};

/// Events emitted by a circuit breaker.
#[derive(Debug, Clone)]
pub enum CircuitBreakerEvent {
    /// A call was admitted.
    CallPermitted {
        guard_name: String,
        timestamp: Instant,
        /// State the call was admitted in (`HalfOpen` for a probe).
        state: CircuitState,
    },
    /// A call was rejected without running.
    CallRejected {
        guard_name: String,
        timestamp: Instant,
        state: CircuitState,
    },
    /// The circuit moved between states.
    StateTransition {
        guard_name: String,
        timestamp: Instant,
        from_state: CircuitState,
        to_state: CircuitState,
    },
    /// An admitted call succeeded.
    SuccessRecorded {
        guard_name: String,
        timestamp: Instant,
        duration: Duration,
        failure_count: usize,
    },
    /// An admitted call failed.
    FailureRecorded {
        guard_name: String,
        timestamp: Instant,
        duration: Duration,
        failure_count: usize,
    },
}

impl GuardEvent for CircuitBreakerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CircuitBreakerEvent::CallPermitted { .. } => "call_permitted",
            CircuitBreakerEvent::CallRejected { .. } => "call_rejected",
            CircuitBreakerEvent::StateTransition { .. } => "state_transition",
            CircuitBreakerEvent::SuccessRecorded { .. } => "success_recorded",
            CircuitBreakerEvent::FailureRecorded { .. } => "failure_recorded",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CircuitBreakerEvent::CallPermitted { timestamp, .. }
            | CircuitBreakerEvent::CallRejected { timestamp, .. }
            | CircuitBreakerEvent::StateTransition { timestamp, .. }
            | CircuitBreakerEvent::SuccessRecorded { timestamp, .. }
            | CircuitBreakerEvent::FailureRecorded { timestamp, .. } => *timestamp,
        }
    }

    fn guard_name(&self) -> &str {
        match self {
            CircuitBreakerEvent::CallPermitted { guard_name, .. }
            | CircuitBreakerEvent::CallRejected { guard_name, .. }
            | CircuitBreakerEvent::StateTransition { guard_name, .. }
            | CircuitBreakerEvent::SuccessRecorded { guard_name, .. }
            | CircuitBreakerEvent::FailureRecorded { guard_name, .. } => guard_name,
        }
    }
}
