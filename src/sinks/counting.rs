//! Allocation-free counters.

use std::ptr::NonNull;

use crate::api::request::{AllocRequest, Caller};
use crate::api::sink::EventSink;
use crate::api::stats::HookStats;
use crate::sync::atomics::{AtomicCounter, AtomicGauge};

/// Counts every event it sees.
///
/// Lock-free and allocation-free, so it may sit on a chain installed as the
/// process allocator.
#[derive(Default)]
pub struct CountingSink {
    inits: AtomicCounter,
    alloc_requests: AtomicCounter,
    allocations: AtomicCounter,
    frees: AtomicCounter,
    reallocs: AtomicCounter,
    failed_reallocs: AtomicCounter,
    bytes_requested: AtomicCounter,
    bytes_released: AtomicCounter,
    live_blocks: AtomicGauge,
    peak_live_blocks: AtomicGauge,
}

impl CountingSink {
    /// A sink with every counter at zero.
    pub const fn new() -> Self {
        Self {
            inits: AtomicCounter::new(0),
            alloc_requests: AtomicCounter::new(0),
            allocations: AtomicCounter::new(0),
            frees: AtomicCounter::new(0),
            reallocs: AtomicCounter::new(0),
            failed_reallocs: AtomicCounter::new(0),
            bytes_requested: AtomicCounter::new(0),
            bytes_released: AtomicCounter::new(0),
            live_blocks: AtomicGauge::new(0),
            peak_live_blocks: AtomicGauge::new(0),
        }
    }

    /// Take a snapshot of the counters.
    ///
    /// Counters are read one by one, so a snapshot taken while other threads
    /// allocate may be slightly inconsistent.
    pub fn stats(&self) -> HookStats {
        HookStats {
            inits: self.inits.get(),
            alloc_requests: self.alloc_requests.get(),
            allocations: self.allocations.get(),
            frees: self.frees.get(),
            reallocs: self.reallocs.get(),
            failed_reallocs: self.failed_reallocs.get(),
            bytes_requested: self.bytes_requested.get(),
            bytes_released: self.bytes_released.get(),
            live_blocks: self.live_blocks.get(),
            peak_live_blocks: self.peak_live_blocks.get(),
        }
    }

    /// Zero every counter.
    pub fn reset(&self) {
        self.inits.reset();
        self.alloc_requests.reset();
        self.allocations.reset();
        self.frees.reset();
        self.reallocs.reset();
        self.failed_reallocs.reset();
        self.bytes_requested.reset();
        self.bytes_released.reset();
        self.live_blocks.set(0);
        self.peak_live_blocks.set(0);
    }
}

impl EventSink for CountingSink {
    fn post_init(&self) {
        self.inits.increment();
    }

    fn pre_alloc(&self, request: AllocRequest, _caller: Caller) -> AllocRequest {
        self.alloc_requests.increment();
        request
    }

    fn post_successful_alloc(
        &self,
        _alloc_ptr: NonNull<u8>,
        _modified: AllocRequest,
        requested: AllocRequest,
        _caller: Caller,
    ) {
        self.allocations.increment();
        self.bytes_requested.add(requested.size as u64);
        let live = self.live_blocks.add(1);
        self.peak_live_blocks.update_max(live);
    }

    fn pre_nonnull_free(&self, _user_ptr: NonNull<u8>, usable_size: usize) {
        self.bytes_released.add(usable_size as u64);
    }

    fn post_nonnull_free(&self, _user_ptr: NonNull<u8>) {
        self.frees.increment();
        self.live_blocks.sub_saturating(1);
    }

    fn post_nonnull_nonzero_realloc(
        &self,
        _user_ptr: NonNull<u8>,
        _modified_size: usize,
        _old_usable_size: usize,
        _caller: Caller,
        result: Option<NonNull<u8>>,
    ) {
        self.reallocs.increment();
        if result.is_none() {
            self.failed_reallocs.increment();
        }
    }
}
