//! Error types shared by every guard.
//!
//! Callers need to tell two situations apart:
//!
//! - the guard refused to run the action at all ([`Rejection`]), and
//! - the action ran and failed on its own ([`GuardError::Inner`]).
//!
//! [`GuardError<E>`] carries both, so a single `match` separates "not attempted
//! due to policy" from "attempted and failed":
//!
//! ```rust
//! use guardrail_core::{GuardError, Rejection};
//!
//! fn describe(err: GuardError<std::io::Error>) -> String {
//!     match err {
//!         GuardError::Rejected(Rejection::CircuitOpen { name }) => {
//!             format!("{name} is open, not attempted")
//!         }
//!         GuardError::Rejected(other) => format!("not attempted: {other}"),
//!         GuardError::Inner(io) => format!("attempted and failed: {io}"),
//!     }
//! }
//! ```

use std::fmt;
use std::time::Duration;

/// Why a guard refused to run an action.
///
/// A rejection always means the action was **not** invoked.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// The circuit breaker is open (or its single half-open probe is in flight).
    #[error("circuit breaker '{name}' is open; call not permitted")]
    CircuitOpen {
        /// Name of the circuit breaker.
        name: String,
    },

    /// No concurrency permit became available within the wait timeout.
    #[error("throttle '{name}' is full: no permit among {max_concurrent} within {timeout:?}")]
    Throttled {
        /// Name of the throttle.
        name: String,
        /// Configured capacity.
        max_concurrent: usize,
        /// How long the caller waited.
        timeout: Duration,
    },

    /// The current flow-rate window has no admissions left.
    #[error("flow rate barrier '{name}' exceeded {max_per_interval} calls per {interval:?}")]
    FlowRateExceeded {
        /// Name of the barrier.
        name: String,
        /// Configured admissions per window.
        max_per_interval: usize,
        /// Window length.
        interval: Duration,
    },

    /// The guard was disposed and no longer admits calls.
    #[error("guard '{name}' has been disposed")]
    Disposed {
        /// Name of the disposed guard.
        name: String,
    },

    /// A guard completed without ever invoking the action.
    ///
    /// The guards in this workspace never produce this; it reports a
    /// third-party [`Guard`](crate::Guard) implementation that dropped the
    /// action it was handed.
    #[error("guard '{name}' finished without invoking the action")]
    Abandoned {
        /// Name of the misbehaving guard.
        name: String,
    },
}

impl Rejection {
    /// Name of the guard that produced this rejection.
    pub fn guard_name(&self) -> &str {
        match self {
            Rejection::CircuitOpen { name }
            | Rejection::Throttled { name, .. }
            | Rejection::FlowRateExceeded { name, .. }
            | Rejection::Disposed { name }
            | Rejection::Abandoned { name } => name,
        }
    }
}

/// Result of running an action through a guard.
///
/// - `Rejected`: the guard did not run the action.
/// - `Inner`: the action ran and returned this error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardError<E> {
    /// Admission was refused; the action was not invoked.
    Rejected(Rejection),
    /// The action was invoked and failed.
    Inner(E),
}

impl<E> fmt::Display for GuardError<E>
where
    E: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardError::Rejected(rejection) => write!(f, "{}", rejection),
            GuardError::Inner(e) => write!(f, "guarded action failed: {}", e),
        }
    }
}

impl<E> std::error::Error for GuardError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GuardError::Rejected(rejection) => Some(rejection),
            GuardError::Inner(e) => Some(e),
        }
    }
}

impl<E> From<Rejection> for GuardError<E> {
    fn from(rejection: Rejection) -> Self {
        GuardError::Rejected(rejection)
    }
}

impl<E> GuardError<E> {
    /// Returns `true` if the action was never invoked.
    pub fn is_rejected(&self) -> bool {
        matches!(self, GuardError::Rejected(_))
    }

    /// Returns `true` if a circuit breaker refused the call.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, GuardError::Rejected(Rejection::CircuitOpen { .. }))
    }

    /// Returns `true` if a throttle timed out waiting for a permit.
    pub fn is_throttled(&self) -> bool {
        matches!(self, GuardError::Rejected(Rejection::Throttled { .. }))
    }

    /// Returns `true` if a flow rate barrier refused the call.
    pub fn is_flow_rate_exceeded(&self) -> bool {
        matches!(
            self,
            GuardError::Rejected(Rejection::FlowRateExceeded { .. })
        )
    }

    /// Returns `true` if the guard had been disposed.
    pub fn is_disposed(&self) -> bool {
        matches!(self, GuardError::Rejected(Rejection::Disposed { .. }))
    }

    /// Returns the rejection, if any.
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            GuardError::Rejected(rejection) => Some(rejection),
            GuardError::Inner(_) => None,
        }
    }

    /// Returns the action's own error, if it ran and failed.
    pub fn into_inner(self) -> Option<E> {
        match self {
            GuardError::Inner(e) => Some(e),
            GuardError::Rejected(_) => None,
        }
    }

    /// Maps the action's error, leaving rejections untouched.
    pub fn map_inner<F, T>(self, f: F) -> GuardError<T>
    where
        F: FnOnce(E) -> T,
    {
        match self {
            GuardError::Rejected(rejection) => GuardError::Rejected(rejection),
            GuardError::Inner(e) => GuardError::Inner(f(e)),
        }
    }
}

/// Invalid guard configuration, reported by the builders.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A circuit breaker threshold below 1.
    #[error("failure threshold must be at least 1, got {0}")]
    InvalidThreshold(usize),

    /// A capacity setting of zero.
    #[error("{field} must be at least 1")]
    ZeroCapacity {
        /// Name of the offending setting.
        field: &'static str,
    },

    /// An interval setting of zero.
    #[error("{field} must be greater than zero")]
    ZeroInterval {
        /// Name of the offending setting.
        field: &'static str,
    },
}
