//! Observability guide for guardrail.
//!
//! Every guard reports what it does in three ways: event listeners registered
//! on its builder, `tracing` events and `metrics` instruments. The last two
//! are behind the `tracing` and `metrics` features.

/// Metrics documentation
pub mod metrics {
    //! # Metrics Guide
    //!
    //! ```toml
    //! [dependencies]
    //! guardrail = { version = "0.3", features = ["full", "metrics"] }
    //! metrics = "0.24"
    //! ```
    //!
    //! Metric descriptions are registered the first time a guard's
    //! `builder()` is called. Every instrument carries the guard's name as a
    //! label, so **name your instances**:
    //!
    //! ```text
    //! circuitbreaker_calls_total{circuitbreaker="payments",outcome="failure"} 12
    //! throttle_calls_rejected_total{throttle="db-pool",reason="timeout"} 3
    //! ```
    //!
    //! ## Circuit Breaker
    //!
    //! - `circuitbreaker_calls_total{circuitbreaker, outcome}`: success, failure or rejected
    //! - `circuitbreaker_transitions_total{circuitbreaker, from, to}`: state transitions
    //! - `circuitbreaker_state{circuitbreaker}`: 0 closed, 1 open, 2 half-open
    //! - `circuitbreaker_failure_count{circuitbreaker}`: current failure count
    //! - `circuitbreaker_call_duration_seconds{circuitbreaker}`: admitted call durations
    //!
    //! ## Concurrency Throttle
    //!
    //! - `throttle_calls_permitted_total{throttle}`
    //! - `throttle_calls_rejected_total{throttle, reason}`: timeout or disposed
    //! - `throttle_calls_finished_total{throttle}` and `throttle_calls_failed_total{throttle}`
    //! - `throttle_concurrent_calls{throttle}`: permits in use
    //! - `throttle_wait_duration_seconds{throttle}`: time spent waiting for a permit
    //!
    //! ## Flow Rate Barrier
    //!
    //! - `flowrate_calls_permitted_total{flowrate}`
    //! - `flowrate_calls_rejected_total{flowrate}`
    //! - `flowrate_window_resets_total{flowrate}`
    //! - `flowrate_window_count{flowrate}`: admissions in the current window
    //!
    //! ## Example Alert
    //!
    //! ```yaml
    //! - alert: CircuitBreakerOpen
    //!   expr: circuitbreaker_state == 1
    //!   for: 1m
    //! ```
}

/// Tracing documentation
pub mod tracing_guide {
    //! # Tracing Guide
    //!
    //! ```toml
    //! [dependencies]
    //! guardrail = { version = "0.3", features = ["full", "tracing"] }
    //! tracing-subscriber = "0.3"
    //! ```
    //!
    //! Admission decisions are logged at `debug`, circuit transitions at
    //! `info` (`warn` when a circuit opens) and throttle timeouts at `warn`:
    //!
    //! ```text
    //! WARN  circuit opened breaker="payments" from=closed to=open
    //! DEBUG call rejected: circuit open breaker="payments" state=open
    //! WARN  no permit available, call rejected throttle="db-pool" max_concurrent=8
    //! ```
}

/// Event system documentation
pub mod events {
    //! # Event System Guide
    //!
    //! Listeners run synchronously on the task that triggered the event, in
    //! registration order. A panicking listener does not affect the guard or
    //! the other listeners.
    //!
    //! ```rust
    //! # #[cfg(feature = "circuitbreaker")]
    //! # {
    //! use guardrail::circuitbreaker::CircuitBreaker;
    //!
    //! let breaker = CircuitBreaker::builder()
    //!     .name("payments")
    //!     .on_state_transition(|from, to| println!("payments: {from} -> {to}"))
    //!     .on_call_rejected(|| println!("payments: short-circuited"))
    //!     .build()
    //!     .unwrap();
    //! # let _ = breaker;
    //! # }
    //! ```
}
