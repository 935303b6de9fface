//! Composing guards into chains.
//!
//! A [`GuardChain`] runs an action only once every member guard has admitted
//! it. Guards are consulted in insertion order; the first to refuse
//! short-circuits the chain, so later guards never see the call and the
//! action never runs.
//!
//! Running an action through a chain `[a, b, c]` is equivalent to
//!
//! ```text
//! a.execute(|| b.execute(|| c.execute(action)))
//! ```
//!
//! so each guard observes the outcome of everything inside it. A circuit
//! breaker placed before a throttle sees the action's failures, but not the
//! throttle's rejections.
//!
//! ```rust
//! # #[cfg(all(feature = "circuitbreaker", feature = "throttle"))]
//! # async fn example() {
//! use guardrail::chain::GuardChainBuilder;
//! use guardrail::circuitbreaker::CircuitBreaker;
//! use guardrail::throttle::ConcurrencyThrottle;
//! use guardrail::GuardExt;
//! use std::time::Duration;
//!
//! let breaker = CircuitBreaker::new(5, Duration::from_secs(30)).unwrap();
//! let throttle = ConcurrencyThrottle::new(8, Duration::from_millis(50)).unwrap();
//!
//! let chain = GuardChainBuilder::new()
//!     .add(breaker)
//!     .unwrap()
//!     .build_with(throttle)
//!     .unwrap();
//!
//! let rows = chain
//!     .execute(|| async { Ok::<_, std::io::Error>(vec![1, 2, 3]) })
//!     .await
//!     .unwrap();
//! assert_eq!(rows.len(), 3);
//! # }
//! ```

use guardrail_core::{Action, ActionFuture, Guard};
use std::fmt;
use std::sync::Arc;
#[cfg(feature = "tracing")]
use tracing::trace;

/// Errors from assembling a guard chain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    /// The chain was closed by `close`, `build` or `build_with`.
    #[error("guard chain is closed; no further guards can be added")]
    Closed,
}

/// Mutable builder for a [`GuardChain`].
///
/// The builder is open until [`close`](Self::close), [`build`](Self::build)
/// or [`build_with`](Self::build_with) is called. After that every attempt to
/// append fails with [`ChainError::Closed`].
#[derive(Default)]
pub struct GuardChainBuilder {
    guards: Vec<Arc<dyn Guard>>,
    name: Option<String>,
    closed: bool,
}

impl GuardChainBuilder {
    /// Creates an empty, open builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Names the chain. Defaults to its members' names joined with `>`.
    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    /// Appends a guard.
    pub fn add<G>(&mut self, guard: G) -> Result<&mut Self, ChainError>
    where
        G: Guard + 'static,
    {
        if self.closed {
            return Err(ChainError::Closed);
        }
        self.guards.push(Arc::new(guard));
        Ok(self)
    }

    /// Appends a final guard and closes the chain.
    pub fn close<G>(&mut self, guard: G) -> Result<&mut Self, ChainError>
    where
        G: Guard + 'static,
    {
        self.add(guard)?;
        self.closed = true;
        Ok(self)
    }

    /// Returns `true` once no further guards can be added.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Number of guards added so far.
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    /// Returns `true` if no guard has been added.
    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    /// Closes the chain and returns it.
    pub fn build(&mut self) -> GuardChain {
        self.closed = true;
        let name = self.name.clone().unwrap_or_else(|| {
            if self.guards.is_empty() {
                "<empty chain>".to_string()
            } else {
                self.guards
                    .iter()
                    .map(|g| g.name())
                    .collect::<Vec<_>>()
                    .join(">")
            }
        });
        GuardChain {
            guards: self.guards.iter().cloned().collect(),
            name,
        }
    }

    /// Appends a final guard, closes the chain and returns it.
    pub fn build_with<G>(&mut self, guard: G) -> Result<GuardChain, ChainError>
    where
        G: Guard + 'static,
    {
        self.close(guard)?;
        Ok(self.build())
    }
}

impl fmt::Debug for GuardChainBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardChainBuilder")
            .field("guards", &self.guards.iter().map(|g| g.name()).collect::<Vec<_>>())
            .field("closed", &self.closed)
            .finish()
    }
}

/// An immutable, ordered sequence of guards that is itself a guard.
///
/// Cheap to clone. Chains can be members of other chains.
#[derive(Clone)]
pub struct GuardChain {
    guards: Arc<[Arc<dyn Guard>]>,
    name: String,
}

impl GuardChain {
    /// Number of member guards.
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    /// Returns `true` for a chain without guards, which runs actions directly.
    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    /// Names of the member guards, outermost first.
    pub fn guard_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.guards.iter().map(|g| g.name())
    }
}

impl fmt::Debug for GuardChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardChain")
            .field("name", &self.name)
            .field("guards", &self.guard_names().collect::<Vec<_>>())
            .finish()
    }
}

impl Guard for GuardChain {
    fn name(&self) -> &str {
        &self.name
    }

    fn run<'a>(&'a self, action: Action<'a>) -> ActionFuture<'a> {
        nest(&self.guards, action)
    }
}

// Wraps `action` in every guard of `guards`, the first one outermost.
fn nest<'a>(guards: &'a [Arc<dyn Guard>], action: Action<'a>) -> ActionFuture<'a> {
    match guards.split_first() {
        None => action(),
        Some((outer, rest)) => {
            #[cfg(feature = "tracing")]
            trace!(guard = %outer.name(), remaining = rest.len(), "entering guard");

            outer.run(Box::new(move || nest(rest, action)))
        }
    }
}
