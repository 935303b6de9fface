//! The guard capability.
//!
//! A guard decides, before invocation, whether a unit of work may run. The
//! object-safe [`Guard`] trait sees the work as a type-erased [`Action`] and
//! only learns whether it succeeded, failed, or was rejected by a nested
//! guard. [`GuardExt`] is the typed entry point callers use.

use crate::error::{GuardError, Rejection};
use futures::future::{BoxFuture, FutureExt, TryFutureExt};
use std::future::Future;
use std::sync::Arc;

/// Marker error handed to guards when the wrapped action failed.
///
/// Guards never see the caller's error value; they only need to know that the
/// action ran and failed. The value itself is returned to the caller untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("guarded action failed")]
pub struct ActionFailed;

/// Future produced by a type-erased action.
pub type ActionFuture<'a> = BoxFuture<'a, Result<(), GuardError<ActionFailed>>>;

/// A type-erased, zero-argument unit of work.
pub type Action<'a> = Box<dyn FnOnce() -> ActionFuture<'a> + Send + 'a>;

/// An admission policy wrapped around a unit of work.
///
/// `run` must either invoke `action` exactly once and return its result, or
/// refuse it with `GuardError::Rejected` without invoking it. Rejections
/// returned by the action itself come from nested guards and must be passed
/// through unchanged.
pub trait Guard: Send + Sync {
    /// Human-readable name used in rejections, events, logs and metrics.
    fn name(&self) -> &str;

    /// Runs `action` subject to this guard's admission policy.
    fn run<'a>(&'a self, action: Action<'a>) -> ActionFuture<'a>;
}

impl<G: Guard + ?Sized> Guard for Arc<G> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn run<'a>(&'a self, action: Action<'a>) -> ActionFuture<'a> {
        (**self).run(action)
    }
}

impl<G: Guard + ?Sized> Guard for Box<G> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn run<'a>(&'a self, action: Action<'a>) -> ActionFuture<'a> {
        (**self).run(action)
    }
}

/// Typed execution on top of [`Guard`], implemented for every guard.
pub trait GuardExt: Guard {
    /// Runs `action` through this guard.
    ///
    /// Returns the action's value, the action's own error as
    /// [`GuardError::Inner`], or [`GuardError::Rejected`] when the guard
    /// refused to run it.
    ///
    /// # Example
    ///
    /// ```rust
    /// use guardrail_core::{Action, ActionFuture, Guard, GuardExt};
    ///
    /// struct PassThrough;
    ///
    /// impl Guard for PassThrough {
    ///     fn name(&self) -> &str {
    ///         "pass-through"
    ///     }
    ///
    ///     fn run<'a>(&'a self, action: Action<'a>) -> ActionFuture<'a> {
    ///         action()
    ///     }
    /// }
    ///
    /// # async fn example() {
    /// let value = PassThrough
    ///     .execute(|| async { Ok::<_, std::io::Error>(42) })
    ///     .await
    ///     .unwrap();
    /// assert_eq!(value, 42);
    /// # }
    /// ```
    fn execute<'a, F, Fut, T, E>(&'a self, action: F) -> BoxFuture<'a, Result<T, GuardError<E>>>
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = Result<T, E>> + Send + 'a,
        T: Send + 'a,
        E: Send + 'a,
    {
        self.execute_guarded(move || action().map_err(GuardError::Inner))
    }

    /// Runs an action that itself goes through other guards.
    ///
    /// Rejections produced inside `action` propagate as rejections of this
    /// call, so an outer circuit breaker does not count them as failures.
    fn execute_guarded<'a, F, Fut, T, E>(
        &'a self,
        action: F,
    ) -> BoxFuture<'a, Result<T, GuardError<E>>>
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = Result<T, GuardError<E>>> + Send + 'a,
        T: Send + 'a,
        E: Send + 'a,
    {
        async move {
            let mut outcome: Option<Result<T, E>> = None;
            let slot = &mut outcome;
            let erased: Action<'_> = Box::new(move || {
                async move {
                    match action().await {
                        Ok(value) => {
                            *slot = Some(Ok(value));
                            Ok(())
                        }
                        Err(GuardError::Inner(err)) => {
                            *slot = Some(Err(err));
                            Err(GuardError::Inner(ActionFailed))
                        }
                        Err(GuardError::Rejected(rejection)) => Err(GuardError::Rejected(rejection)),
                    }
                }
                .boxed()
            });

            let verdict = self.run(erased).await;

            match (verdict, outcome) {
                (Err(GuardError::Rejected(rejection)), _) => Err(GuardError::Rejected(rejection)),
                (_, Some(Ok(value))) => Ok(value),
                (_, Some(Err(err))) => Err(GuardError::Inner(err)),
                (_, None) => Err(GuardError::Rejected(Rejection::Abandoned {
                    name: self.name().to_string(),
                })),
            }
        }
        .boxed()
    }
}

impl<G: Guard + ?Sized> GuardExt for G {}
