//! Synchronization primitives used by the bundled sinks.
//!
//! The interceptor itself holds no mutable state; only sinks need these.
//! The mutex backs the leak tracker, so it only exists with `debug`.

pub(crate) mod atomics;
#[cfg(feature = "debug")]
pub(crate) mod mutex;
