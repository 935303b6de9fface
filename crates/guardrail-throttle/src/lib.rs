//! Concurrency throttle guard.
//!
//! A throttle isolates a resource by bounding how many actions may run
//! against it at the same time. It uses a semaphore: each call acquires a
//! permit, waiting at most the configured timeout, and releases it when the
//! action ends, however it ends.
//!
//! # Basic Example
//!
//! ```rust
//! use guardrail_core::GuardExt;
//! use guardrail_throttle::ConcurrencyThrottle;
//! use std::time::Duration;
//!
//! # async fn example() {
//! // At most 10 concurrent calls, each waiting up to 100ms for a slot
//! let throttle = ConcurrencyThrottle::new(10, Duration::from_millis(100)).unwrap();
//!
//! let result = throttle
//!     .execute(|| async { Ok::<_, std::io::Error>("done") })
//!     .await;
//! assert_eq!(result.unwrap(), "done");
//! # }
//! ```
//!
//! # Rejections
//!
//! When no permit frees up within the timeout the action is not run and the
//! call fails with [`Rejection::Throttled`](guardrail_core::Rejection::Throttled).
//! A zero timeout admits a call only when a permit is free immediately.
//!
//! ```rust
//! use guardrail_core::GuardExt;
//! use guardrail_throttle::ConcurrencyThrottle;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let throttle = ConcurrencyThrottle::new(1, Duration::ZERO).unwrap();
//!
//! let slow = throttle.execute(|| async {
//!     tokio::time::sleep(Duration::from_millis(50)).await;
//!     Ok::<_, ()>(())
//! });
//! let fast = throttle.execute(|| async { Ok::<_, ()>(()) });
//!
//! let (slow, fast) = futures::join!(slow, fast);
//! assert!(slow.is_ok());
//! assert!(fast.unwrap_err().is_throttled());
//! # }
//! ```
//!
//! # Example with Event Listeners
//!
//! ```rust
//! use guardrail_throttle::ConcurrencyThrottle;
//!
//! let throttle = ConcurrencyThrottle::builder()
//!     .max_concurrent_requests(4)
//!     .name("db-pool")
//!     .on_call_rejected(|max| eprintln!("db-pool saturated ({max} in flight)"))
//!     .on_call_finished(|duration| println!("query took {duration:?}"))
//!     .build()
//!     .unwrap();
//! # let _ = throttle;
//! ```
//!
//! # Features
//!
//! - `tracing`: log permits and rejections
//! - `metrics`: export `throttle_*` counters, gauges and histograms

pub mod config;
pub mod events;
mod throttle;

pub use config::{ThrottleConfig, ThrottleConfigBuilder};
pub use events::ThrottleEvent;
pub use throttle::ConcurrencyThrottle;
