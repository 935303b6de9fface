//! Tower integration: apply any guard to every request of a service.
//!
//! ```rust
//! use guardrail_core::{Action, ActionFuture, Guard, GuardLayer};
//! use tower::{ServiceBuilder, service_fn};
//!
//! #[derive(Clone)]
//! struct PassThrough;
//!
//! impl Guard for PassThrough {
//!     fn name(&self) -> &str {
//!         "pass-through"
//!     }
//!
//!     fn run<'a>(&'a self, action: Action<'a>) -> ActionFuture<'a> {
//!         action()
//!     }
//! }
//!
//! let service = ServiceBuilder::new()
//!     .layer(GuardLayer::new(PassThrough))
//!     .service(service_fn(|req: String| async move { Ok::<_, std::io::Error>(req) }));
//! ```

use crate::error::GuardError;
use crate::guard::{Guard, GuardExt};
use futures::future::BoxFuture;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// A tower layer that runs every call of the wrapped service through a guard.
///
/// Guards are cheap handles over shared state, so every service produced by
/// the layer shares the same admission policy.
#[derive(Debug, Clone)]
pub struct GuardLayer<G> {
    guard: G,
}

impl<G> GuardLayer<G> {
    /// Creates a layer around `guard`.
    pub fn new(guard: G) -> Self {
        Self { guard }
    }

    /// Returns the guard applied by this layer.
    pub fn guard(&self) -> &G {
        &self.guard
    }
}

impl<S, G: Clone> Layer<S> for GuardLayer<G> {
    type Service = Guarded<S, G>;

    fn layer(&self, service: S) -> Self::Service {
        Guarded {
            inner: service,
            guard: self.guard.clone(),
        }
    }
}

/// A service whose calls are admitted by a guard.
#[derive(Debug, Clone)]
pub struct Guarded<S, G> {
    inner: S,
    guard: G,
}

impl<S, G> Guarded<S, G> {
    /// Wraps `inner` with `guard`.
    pub fn new(inner: S, guard: G) -> Self {
        Self { inner, guard }
    }

    /// Returns the guard.
    pub fn guard(&self) -> &G {
        &self.guard
    }

    /// Returns the wrapped service.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }
}

impl<S, G, Req> Service<Req> for Guarded<S, G>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Response: Send + 'static,
    S::Error: Send + 'static,
    S::Future: Send + 'static,
    Req: Send + 'static,
    G: Guard + Clone + 'static,
{
    type Response = S::Response;
    type Error = GuardError<S::Error>;
    type Future = BoxFuture<'static, Result<S::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(GuardError::Inner)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let guard = self.guard.clone();
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move { guard.execute(move || inner.call(req)).await })
    }
}
