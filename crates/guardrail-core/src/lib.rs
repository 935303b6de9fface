//! Core infrastructure for guardrail.
//!
//! This crate provides what every guard shares:
//! - The [`Guard`] capability and the typed [`GuardExt::execute`] entry point
//! - Rejection and configuration errors
//! - The event system used for observability
//! - [`GuardLayer`] for tower services (`layer` feature)

pub mod error;
pub mod events;
pub mod guard;
#[cfg(feature = "layer")]
pub mod layer;

pub use error::{ConfigError, GuardError, Rejection};
pub use events::{EventListener, EventListeners, FnListener, GuardEvent};
pub use guard::{Action, ActionFailed, ActionFuture, Guard, GuardExt};
#[cfg(feature = "layer")]
pub use layer::{GuardLayer, Guarded};

/// Locks a mutex, recovering the data if a previous holder panicked.
///
/// Guards only mutate their state in short critical sections that leave it
/// consistent, so a poisoned lock carries no torn state.
pub fn lock<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
