use std::time::Duration;
use tokio::time::Instant;

/// Represents the state of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CircuitState {
    /// The circuit is closed and calls are allowed.
    Closed = 0,
    /// The circuit is tripped and calls are rejected.
    Open = 1,
    /// The circuit is probing: a single call is allowed through.
    HalfOpen = 2,
}

impl CircuitState {
    /// Alternative name for [`CircuitState::HalfOpen`].
    pub const HALF_CLOSED: CircuitState = CircuitState::HalfOpen;

    /// Stable lowercase name, used for logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of circuit breaker state for observability.
///
/// All fields are read under one lock, so they are consistent with each other.
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitMetrics {
    /// Current state of the circuit breaker.
    pub state: CircuitState,
    /// Current failure counter, in `[0, threshold]`.
    pub failure_count: usize,
    /// Failures needed to trip the circuit.
    pub threshold: usize,
    /// `100 * (threshold - failure_count) / threshold`.
    pub service_level: f64,
    /// Whether the reset timer moves the circuit out of `Open`.
    pub auto_reset: bool,
    /// Time since the last state transition.
    pub time_since_state_change: Duration,
}

/// Inputs to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Signal {
    Success,
    Failure,
    /// The half-open probe admitted during `generation` ended without an outcome.
    ProbeAbandoned { generation: u64 },
    /// The reset interval of the open period `generation` has elapsed.
    ResetElapsed { generation: u64 },
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Transition {
    pub(crate) from: CircuitState,
    pub(crate) to: CircuitState,
}

/// Side effect the owner of the circuit must carry out while still holding its lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Effect {
    None,
    ArmResetTimer { generation: u64 },
    CancelResetTimer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Step {
    pub(crate) transition: Option<Transition>,
    pub(crate) effect: Effect,
}

impl Step {
    const IDLE: Step = Step {
        transition: None,
        effect: Effect::None,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Admission {
    Permitted,
    Probe { generation: u64 },
    Rejected,
}

/// The circuit breaker state machine.
///
/// Pure bookkeeping: it never reads the clock, spawns or emits. Callers hold
/// it behind a mutex and act on the returned [`Step`].
///
/// Outcomes are not tied to the admission that produced them. A call
/// admitted while closed that finishes after the circuit went half-open
/// decides the half-open outcome, even while the probe is still running.
#[derive(Debug)]
pub(crate) struct Circuit {
    state: CircuitState,
    failure_count: usize,
    threshold: usize,
    reset_interval: Duration,
    // Bumped on every trip and reset; identifies the current open period.
    generation: u64,
    probe_in_flight: bool,
    opened_at: Option<Instant>,
    last_state_change: Instant,
}

impl Circuit {
    pub(crate) fn new(threshold: usize, reset_interval: Duration, now: Instant) -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            threshold,
            reset_interval,
            generation: 0,
            probe_in_flight: false,
            opened_at: None,
            last_state_change: now,
        }
    }

    pub(crate) fn state(&self) -> CircuitState {
        self.state
    }

    pub(crate) fn failure_count(&self) -> usize {
        self.failure_count
    }

    pub(crate) fn service_level(&self) -> f64 {
        let healthy = self.threshold - self.failure_count;
        100.0 * healthy as f64 / self.threshold as f64
    }

    pub(crate) fn metrics(&self, auto_reset: bool, now: Instant) -> CircuitMetrics {
        CircuitMetrics {
            state: self.state,
            failure_count: self.failure_count,
            threshold: self.threshold,
            service_level: self.service_level(),
            auto_reset,
            time_since_state_change: now.saturating_duration_since(self.last_state_change),
        }
    }

    /// Moves an expired open circuit to half-open when no timer did it yet.
    pub(crate) fn refresh(&mut self, auto_reset: bool, now: Instant) -> Option<Transition> {
        let expired = matches!(
            self.opened_at,
            Some(opened) if now.saturating_duration_since(opened) >= self.reset_interval
        );
        if self.state == CircuitState::Open && expired {
            let generation = self.generation;
            self.apply(Signal::ResetElapsed { generation }, auto_reset, now)
                .transition
        } else {
            None
        }
    }

    pub(crate) fn admit(&mut self) -> Admission {
        match self.state {
            CircuitState::Closed => Admission::Permitted,
            CircuitState::HalfOpen if !self.probe_in_flight => {
                self.probe_in_flight = true;
                Admission::Probe {
                    generation: self.generation,
                }
            }
            CircuitState::HalfOpen | CircuitState::Open => Admission::Rejected,
        }
    }

    pub(crate) fn apply(&mut self, signal: Signal, auto_reset: bool, now: Instant) -> Step {
        match signal {
            Signal::Success => {
                self.failure_count = self.failure_count.saturating_sub(1);
                if self.state == CircuitState::HalfOpen {
                    self.failure_count = 0;
                    self.transition_to(CircuitState::Closed, now)
                } else {
                    Step::IDLE
                }
            }
            Signal::Failure => {
                self.failure_count = (self.failure_count + 1).min(self.threshold);
                let trips = match self.state {
                    CircuitState::HalfOpen => true,
                    CircuitState::Closed => self.failure_count >= self.threshold,
                    CircuitState::Open => false,
                };
                if trips {
                    self.trip(auto_reset, now)
                } else {
                    Step::IDLE
                }
            }
            Signal::ProbeAbandoned { generation } => {
                if self.state == CircuitState::HalfOpen && generation == self.generation {
                    self.probe_in_flight = false;
                }
                Step::IDLE
            }
            Signal::ResetElapsed { generation } => {
                if auto_reset && self.state == CircuitState::Open && generation == self.generation
                {
                    self.opened_at = None;
                    self.transition_to(CircuitState::HalfOpen, now)
                } else {
                    Step::IDLE
                }
            }
            Signal::Reset => {
                self.failure_count = 0;
                self.generation += 1;
                self.opened_at = None;
                let mut step = self.transition_to(CircuitState::Closed, now);
                step.effect = Effect::CancelResetTimer;
                step
            }
        }
    }

    fn trip(&mut self, auto_reset: bool, now: Instant) -> Step {
        self.generation += 1;
        self.opened_at = Some(now);
        let mut step = self.transition_to(CircuitState::Open, now);
        if auto_reset {
            step.effect = Effect::ArmResetTimer {
                generation: self.generation,
            };
        }
        step
    }

    fn transition_to(&mut self, to: CircuitState, now: Instant) -> Step {
        let from = self.state;
        if from == to {
            return Step::IDLE;
        }
        self.state = to;
        self.probe_in_flight = false;
        self.last_state_change = now;
        Step {
            transition: Some(Transition { from, to }),
            effect: Effect::None,
        }
    }
}
