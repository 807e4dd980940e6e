//! `std::alloc::GlobalAlloc` over an interception chain.
//!
//! Installing a chain as the process allocator is left to the user:
//!
//! ```rust,ignore
//! use allochook::{CountingSink, HookedAlloc, Interceptor, Next, SystemAllocator};
//!
//! #[global_allocator]
//! static GLOBAL: HookedAlloc<Interceptor<CountingSink, allochook::Terminal<SystemAllocator>>> =
//!     HookedAlloc::new(Interceptor::new(CountingSink::new(), Next::terminal(SystemAllocator)));
//! ```
//!
//! Every sink on such a chain runs inside the process allocator, so it must
//! not allocate. [`CountingSink`](crate::CountingSink) is safe there;
//! [`RecordingSink`](crate::RecordingSink) and the leak tracker are not.

use std::alloc::{GlobalAlloc, Layout};
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicU8, Ordering};

use super::chain::AllocatorHooks;
use crate::diagnostics::macros::ah_report;
use super::request::{Caller, POINTER_ALIGN};

const UNINITIALIZED: u8 = 0;
const INITIALIZING: u8 = 1;
const INITIALIZED: u8 = 2;

/// Adapts an [`AllocatorHooks`] chain to [`GlobalAlloc`].
///
/// Layouts aligned to at most [`POINTER_ALIGN`] use `malloc`/`realloc`;
/// stricter alignments use `memalign`. The chain's `init` runs once, before
/// the first allocation that reaches it.
pub struct HookedAlloc<H> {
    hooks: H,
    state: AtomicU8,
}

impl<H> HookedAlloc<H> {
    /// Wrap a chain. `const`, for use in a `#[global_allocator]` static.
    pub const fn new(hooks: H) -> Self {
        Self {
            hooks,
            state: AtomicU8::new(UNINITIALIZED),
        }
    }

    /// The wrapped chain.
    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    /// Whether the chain's `init` has completed.
    pub fn is_initialized(&self) -> bool {
        self.state.load(Ordering::Acquire) == INITIALIZED
    }
}

impl<H: AllocatorHooks> HookedAlloc<H> {
    #[inline]
    fn ensure_init(&self) {
        if self.state.load(Ordering::Acquire) == INITIALIZED {
            return;
        }
        self.init_slow();
    }

    #[cold]
    fn init_slow(&self) {
        // Losing the race means another thread is initialising, or a sink
        // allocated from inside `post_init`. Either way, go ahead: waiting
        // here could deadlock.
        if self
            .state
            .compare_exchange(UNINITIALIZED, INITIALIZING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.hooks.init();
            self.state.store(INITIALIZED, Ordering::Release);
        }
    }

    /// Usable size of a live block from this allocator.
    ///
    /// # Safety
    ///
    /// `ptr` must be a live block from `alloc` or `realloc`.
    pub unsafe fn usable_size(&self, ptr: NonNull<u8>) -> usize {
        self.hooks.usable_size(ptr)
    }

    #[inline]
    fn alloc_layout(&self, layout: Layout) -> *mut u8 {
        if layout.align() <= POINTER_ALIGN {
            self.hooks.malloc(layout.size(), Caller::UNKNOWN)
        } else {
            self.hooks
                .memalign(layout.align(), layout.size(), Caller::UNKNOWN)
        }
    }
}

unsafe impl<H: AllocatorHooks> GlobalAlloc for HookedAlloc<H> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        self.ensure_init();
        self.alloc_layout(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
        self.hooks.free(ptr, Caller::UNKNOWN);
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if layout.align() <= POINTER_ALIGN {
            return self.hooks.realloc(ptr, new_size, Caller::UNKNOWN);
        }

        // `realloc` would drop the alignment, so move the block by hand.
        let Ok(new_layout) = Layout::from_size_align(new_size, layout.align()) else {
            ah_report!(
                AH901,
                "realloc to {} bytes at alignment {} has no valid layout",
                new_size,
                layout.align()
            );
            return ptr::null_mut();
        };
        let new_ptr = self.alloc_layout(new_layout);
        if !new_ptr.is_null() {
            ptr::copy_nonoverlapping(ptr, new_ptr, layout.size().min(new_size));
            self.hooks.free(ptr, Caller::UNKNOWN);
        }
        new_ptr
    }
}
