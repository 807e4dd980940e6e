//! Lock-free counters for sink statistics.
//!
//! Everything here is `const`-constructible and allocation-free, so a sink
//! built from these can sit under a `#[global_allocator]`.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// A monotonically increasing event counter.
pub struct AtomicCounter(AtomicU64);

impl AtomicCounter {
    /// Create a new counter.
    pub const fn new(initial: u64) -> Self {
        Self(AtomicU64::new(initial))
    }

    /// Increment the counter.
    #[inline]
    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Add a value to the counter.
    #[inline]
    pub fn add(&self, value: u64) {
        self.0.fetch_add(value, Ordering::Relaxed);
    }

    /// Get the current value.
    #[inline]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    /// Reset to zero.
    pub fn reset(&self) {
        self.0.store(0, Ordering::Relaxed);
    }
}

impl Default for AtomicCounter {
    fn default() -> Self {
        Self::new(0)
    }
}

/// A byte gauge that moves both ways and never wraps below zero.
pub struct AtomicGauge(AtomicUsize);

impl AtomicGauge {
    /// Create a new gauge.
    pub const fn new(initial: usize) -> Self {
        Self(AtomicUsize::new(initial))
    }

    /// Add to the gauge, returning the new value.
    #[inline]
    pub fn add(&self, value: usize) -> usize {
        self.0.fetch_add(value, Ordering::Relaxed).wrapping_add(value)
    }

    /// Subtract from the gauge, clamping at zero.
    ///
    /// Blocks allocated before a sink was wired in are freed through it too,
    /// so a plain `fetch_sub` could wrap.
    #[inline]
    pub fn sub_saturating(&self, value: usize) {
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                Some(current.saturating_sub(value))
            });
    }

    /// Get the current value.
    #[inline]
    pub fn get(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }

    /// Set the value.
    pub fn set(&self, value: usize) {
        self.0.store(value, Ordering::Relaxed);
    }

    /// Update the maximum (for high-water marks).
    pub fn update_max(&self, value: usize) {
        let mut current = self.0.load(Ordering::Relaxed);
        while value > current {
            match self.0.compare_exchange_weak(
                current,
                value,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(c) => current = c,
            }
        }
    }
}

impl Default for AtomicGauge {
    fn default() -> Self {
        Self::new(0)
    }
}
