//! # allochook
//!
//! Chainable interception of `malloc`, `free`, `memalign` and `realloc`
//! with pre/post instrumentation events.
//!
//! ## Features
//!
//! - One [`Interceptor`] per link, generic over its event sink and next link
//! - Sinks observe every call and may grow requests to make room for metadata
//! - Address translation between the allocator's block and the user pointer
//! - `realloc` split into its malloc-like, free-like and genuine cases
//! - Chains are `const`-constructible and install as a `#[global_allocator]`
//! - Ready-made sinks: counters, an event journal, poisoning, leak tracking
//! - Coded diagnostics for sink contract violations, optional per-call traces
//!
//! ## Quick Start
//!
//! ```rust
//! use allochook::{Caller, CountingSink, Interceptor, Next, SystemAllocator};
//!
//! let hooks = Interceptor::new(CountingSink::new(), Next::terminal(SystemAllocator));
//! hooks.init();
//!
//! let ptr = hooks.malloc(64, Caller::UNKNOWN);
//! assert!(!ptr.is_null());
//! unsafe { hooks.free(ptr, Caller::UNKNOWN) };
//!
//! let stats = hooks.sink().stats();
//! assert_eq!(stats.allocations, 1);
//! assert_eq!(stats.frees, 1);
//! ```
//!
//! ## Chaining
//!
//! A link's next link is either another hook link or a terminal allocator.
//! Events nest: for a chain `A -> B -> allocator`, `A` sees the pre event
//! first and the post event last.
//!
//! ```rust
//! use allochook::{Interceptor, Next, NoopSink, SystemAllocator};
//!
//! let inner = Interceptor::new(NoopSink, Next::terminal(SystemAllocator));
//! let outer = Interceptor::new(NoopSink, Next::hook(inner));
//! outer.init();
//! ```

pub mod api;
pub mod diagnostics;
pub mod sinks;

mod allocators;
mod sync;
mod util;

// Core interception
pub use api::chain::{AllocatorHooks, Link, Next, RawAllocator, Terminal, Unlinked};
pub use api::interceptor::{HookOp, Interceptor, ReallocCase};
pub use api::request::{AllocRequest, Caller, POINTER_ALIGN};
pub use api::sink::{EventSink, NoopSink};
pub use api::translate::{AddressTranslator, HeaderOffset, Identity};

// Configuration and statistics
pub use api::config::{ContractPolicy, HookConfig};
pub use api::stats::HookStats;

// Rust allocator adapter
pub use api::global::HookedAlloc;

// Terminal allocators
#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "macos",
    target_os = "ios"
))]
pub use allocators::SystemAllocator;

// Bundled sinks
pub use sinks::{CountingSink, HookEvent, PoisonSink, RecordedEvent, RecordingSink};

#[cfg(feature = "debug")]
pub use sinks::{AllocationTrace, LeakTracker};

// Diagnostics
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use diagnostics::{set_strict_mode, StrictMode, StrictModeGuard};
pub use diagnostics::{AH001, AH002, AH003, AH901};
