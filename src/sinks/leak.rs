//! Live-allocation tracking with backtraces.
//!
//! Records where each live block was allocated so leaks can be reported.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::ptr::NonNull;

use crate::api::request::{AllocRequest, Caller};
use crate::api::sink::EventSink;
use crate::sync::atomics::AtomicCounter;
use crate::sync::mutex::Mutex;
use crate::util::size::format_bytes;

/// A live allocation as seen by the tracker.
#[derive(Debug, Clone)]
pub struct AllocationTrace {
    /// User address of the block.
    pub address: usize,

    /// Size the caller asked for, updated by every successful realloc.
    pub size: usize,

    /// Caller identity passed to the hook.
    pub caller: Caller,

    /// Captured backtrace, empty when capture is off.
    pub backtrace: String,

    /// Generation the allocation happened in.
    pub generation: u64,
}

/// Tracks every live block and where it came from.
///
/// This sink allocates on every event. Never place it on a chain that
/// serves as the process allocator.
pub struct LeakTracker {
    table: Mutex<Table>,
    generation: AtomicCounter,
    header: usize,
    capture: bool,
}

#[derive(Default)]
struct Table {
    live: HashMap<usize, AllocationTrace>,
    // user address -> size requested by a realloc in flight
    resizing: HashMap<usize, usize>,
}

impl LeakTracker {
    /// A tracker for a link whose user and allocation pointers are equal.
    pub fn new() -> Self {
        Self::with_header(0)
    }

    /// A tracker for a link that places user pointers `header` bytes past
    /// allocation pointers, as [`HeaderOffset`](crate::HeaderOffset) does.
    ///
    /// Allocation events carry allocator addresses and free events carry
    /// user addresses; the offset lets both meet on the user address. Only
    /// addresses are computed, nothing is dereferenced.
    pub fn with_header(header: usize) -> Self {
        Self {
            table: Mutex::new(Table::default()),
            generation: AtomicCounter::new(0),
            header,
            capture: true,
        }
    }

    /// Skip backtrace capture. Much cheaper, still tracks sizes and callers.
    pub fn without_backtraces(mut self) -> Self {
        self.capture = false;
        self
    }

    /// Advance the generation stamped on new allocations.
    pub fn next_generation(&self) {
        self.generation.increment();
    }

    /// Current generation.
    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    /// The trace for a live user address.
    pub fn trace(&self, address: usize) -> Option<AllocationTrace> {
        self.table.lock().live.get(&address).cloned()
    }

    /// Number of live blocks.
    pub fn live_count(&self) -> usize {
        self.table.lock().live.len()
    }

    /// All live blocks, oldest generation first.
    pub fn live_allocations(&self) -> Vec<AllocationTrace> {
        let mut live: Vec<_> = self.table.lock().live.values().cloned().collect();
        live.sort_by_key(|t| (t.generation, t.address));
        live
    }

    /// Live blocks allocated before `generation`.
    pub fn leaked_before(&self, generation: u64) -> Vec<AllocationTrace> {
        let mut live = self.live_allocations();
        live.retain(|t| t.generation < generation);
        live
    }

    /// Render a leak report.
    pub fn leak_report(&self) -> String {
        let live = self.live_allocations();
        if live.is_empty() {
            return "[allochook] No live allocations (no leaks detected)\n".to_string();
        }

        let total: usize = live.iter().map(|t| t.size).sum();
        let mut out = String::new();
        let _ = writeln!(
            out,
            "[allochook] Leak report: {} live allocations, {}",
            live.len(),
            format_bytes(total)
        );
        for trace in &live {
            let _ = writeln!(
                out,
                "  Address: 0x{:x}, Size: {}, Caller: {:?}, Generation: {}",
                trace.address,
                format_bytes(trace.size),
                trace.caller,
                trace.generation
            );
            if !trace.backtrace.is_empty() {
                let _ = writeln!(out, "{}", trace.backtrace);
            }
        }
        out
    }

    /// Print the leak report to stdout.
    pub fn print_leak_report(&self) {
        print!("{}", self.leak_report());
    }

    fn record(&self, address: usize, size: usize, caller: Caller, generation: u64) {
        let backtrace = if self.capture {
            format!("{:?}", backtrace::Backtrace::new())
        } else {
            String::new()
        };
        let trace = AllocationTrace {
            address,
            size,
            caller,
            backtrace,
            generation,
        };
        self.table.lock().live.insert(address, trace);
    }

    fn user_address(&self, alloc_ptr: NonNull<u8>) -> usize {
        (alloc_ptr.as_ptr() as usize).wrapping_add(self.header)
    }
}

impl Default for LeakTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LeakTracker {
    fn post_successful_alloc(
        &self,
        alloc_ptr: NonNull<u8>,
        _modified: AllocRequest,
        requested: AllocRequest,
        caller: Caller,
    ) {
        self.record(
            self.user_address(alloc_ptr),
            requested.size,
            caller,
            self.generation.get(),
        );
    }

    fn post_nonnull_free(&self, user_ptr: NonNull<u8>) {
        self.table.lock().live.remove(&(user_ptr.as_ptr() as usize));
    }

    fn pre_nonnull_nonzero_realloc(
        &self,
        user_ptr: NonNull<u8>,
        requested_size: usize,
        _caller: Caller,
    ) {
        self.table
            .lock()
            .resizing
            .insert(user_ptr.as_ptr() as usize, requested_size);
    }

    fn post_nonnull_nonzero_realloc(
        &self,
        user_ptr: NonNull<u8>,
        modified_size: usize,
        _old_usable_size: usize,
        caller: Caller,
        result: Option<NonNull<u8>>,
    ) {
        let old_address = user_ptr.as_ptr() as usize;
        let mut table = self.table.lock();
        let requested = table.resizing.remove(&old_address);
        // A failed realloc leaves the old block live.
        let Some(new_ptr) = result else {
            return;
        };
        let old = table.live.remove(&old_address);
        drop(table);

        // `modified_size` includes whatever the sink added for its header.
        let size = requested.unwrap_or_else(|| modified_size.saturating_sub(self.header));
        // The block keeps its original generation.
        let generation = old.map_or_else(|| self.generation.get(), |t| t.generation);
        self.record(self.user_address(new_ptr), size, caller, generation);
    }
}
