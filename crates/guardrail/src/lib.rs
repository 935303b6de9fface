//! Composable guards for async Rust.
//!
//! A guard decides, before invocation, whether a unit of work may run. Every
//! guard is used the same way, through [`GuardExt::execute`], and returns
//! either the action's result or a [`Rejection`] saying why it did not run.
//!
//! # Guards
//!
//! - **Circuit breaker** (`circuitbreaker` feature): stops invoking an
//!   operation after repeated failures and probes it for recovery
//! - **Concurrency throttle** (`throttle` feature): bounds how many actions
//!   run at once, with a wait timeout
//! - **Flow rate barrier** (`flowrate` feature): bounds admissions per fixed
//!   time window
//! - **Guard chains** (always available): compose guards so an action must
//!   pass all of them
//!
//! # Usage
//!
//! Enable specific guards via features:
//!
//! ```toml
//! [dependencies]
//! guardrail = { version = "0.3", features = ["circuitbreaker", "throttle"] }
//! ```
//!
//! Or enable everything:
//!
//! ```toml
//! [dependencies]
//! guardrail = { version = "0.3", features = ["full"] }
//! ```
//!
//! # Example
//!
//! ```rust
//! # #[cfg(all(feature = "circuitbreaker", feature = "flowrate"))]
//! # async fn example() {
//! use guardrail::prelude::*;
//! use std::time::Duration;
//!
//! let chain = GuardChainBuilder::new()
//!     .add(FlowRateBarrier::new(100, Duration::from_secs(1)).unwrap())
//!     .unwrap()
//!     .build_with(CircuitBreaker::new(5, Duration::from_secs(30)).unwrap())
//!     .unwrap();
//!
//! match chain.execute(|| async { Ok::<_, std::io::Error>("pong") }).await {
//!     Ok(reply) => println!("{reply}"),
//!     Err(GuardError::Rejected(why)) => println!("not attempted: {why}"),
//!     Err(GuardError::Inner(err)) => println!("attempted and failed: {err}"),
//! }
//! # }
//! ```
//!
//! # Individual Crates
//!
//! Each guard is also available as a standalone crate:
//!
//! - `guardrail-circuitbreaker`
//! - `guardrail-throttle`
//! - `guardrail-flowrate`
//! - `guardrail-core` (guard trait, errors, events, tower layer)

pub mod chain;
pub mod observability;

// Re-export core (always available)
pub use guardrail_core as core;
pub use guardrail_core::{ConfigError, Guard, GuardError, GuardExt, Rejection};

pub use chain::{ChainError, GuardChain, GuardChainBuilder};

// Re-export guards based on features
#[cfg(feature = "circuitbreaker")]
pub use guardrail_circuitbreaker as circuitbreaker;

#[cfg(feature = "throttle")]
pub use guardrail_throttle as throttle;

#[cfg(feature = "flowrate")]
pub use guardrail_flowrate as flowrate;

#[cfg(feature = "layer")]
pub use guardrail_core::{GuardLayer, Guarded};

/// The types needed to build and run guards.
pub mod prelude {
    pub use crate::chain::{ChainError, GuardChain, GuardChainBuilder};
    pub use guardrail_core::{Guard, GuardError, GuardExt, Rejection};

    #[cfg(feature = "circuitbreaker")]
    pub use guardrail_circuitbreaker::{CircuitBreaker, CircuitState};
    #[cfg(feature = "flowrate")]
    pub use guardrail_flowrate::{FlowRateBarrier, WindowLimit};
    #[cfg(feature = "layer")]
    pub use guardrail_core::GuardLayer;
    #[cfg(feature = "throttle")]
    pub use guardrail_throttle::ConcurrencyThrottle;
}
