//! Ready-made event sinks.
//!
//! - [`CountingSink`]: lock-free counters, safe under a global allocator
//! - [`RecordingSink`]: an ordered event journal for tests
//! - [`PoisonSink`]: fills fresh and freed memory with patterns
//! - [`LeakTracker`]: live allocations with backtraces (feature `debug`)

pub mod counting;
pub mod poison;
pub mod recording;

#[cfg(feature = "debug")]
pub mod leak;

pub use counting::CountingSink;
pub use poison::{PoisonSink, FREED_PATTERN, UNINIT_PATTERN};
pub use recording::{HookEvent, RecordedEvent, RecordingSink};

#[cfg(feature = "debug")]
pub use leak::{AllocationTrace, LeakTracker};
