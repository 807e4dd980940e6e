//! The two shapes an interceptor can delegate to.
//!
//! A link in a chain forwards either to another hook surface
//! ([`AllocatorHooks`], which carries caller identity and an `init` step) or
//! to a terminal allocator ([`RawAllocator`], plain C-style primitives).
//! [`Next`] is the tagged choice between the two.

use std::ptr::NonNull;

use super::request::Caller;

/// The hook surface every chain link consumes and exposes.
///
/// Mirrors the platform allocator's `malloc`/`free`/`memalign`/`realloc`
/// hooks, plus an initialisation step and a usable-size query.
///
/// # Safety
///
/// Implementors must behave like an allocator: a non-null pointer returned
/// by `malloc`, `memalign` or a successful `realloc` is valid for reads and
/// writes of the requested size until it is passed back to `free` or
/// `realloc`, and `usable_size` never reports less than the size requested.
pub unsafe trait AllocatorHooks {
    /// Initialise this link and everything behind it.
    fn init(&self);

    /// Allocate `size` bytes with pointer alignment. Null on failure.
    fn malloc(&self, size: usize, caller: Caller) -> *mut u8;

    /// Release a block. Null is a no-op.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live block obtained from this same surface.
    unsafe fn free(&self, ptr: *mut u8, caller: Caller);

    /// Allocate `size` bytes aligned to `alignment`. Null on failure.
    fn memalign(&self, alignment: usize, size: usize, caller: Caller) -> *mut u8;

    /// Resize a block, with C `realloc` semantics for null and zero.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live block obtained from this same surface.
    unsafe fn realloc(&self, ptr: *mut u8, size: usize, caller: Caller) -> *mut u8;

    /// Bytes actually reserved for a live block.
    ///
    /// # Safety
    ///
    /// `ptr` must be a live block obtained from this same surface.
    unsafe fn usable_size(&self, ptr: NonNull<u8>) -> usize;
}

/// A terminal allocator: the end of a chain.
///
/// # Safety
///
/// Same contract as [`AllocatorHooks`].
pub unsafe trait RawAllocator {
    /// Allocate `size` bytes with pointer alignment. Null on failure.
    fn malloc(&self, size: usize) -> *mut u8;

    /// Release a block. Null is a no-op.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live block from this allocator.
    unsafe fn free(&self, ptr: *mut u8);

    /// Allocate `size` bytes aligned to `alignment`. Null on failure.
    fn memalign(&self, alignment: usize, size: usize) -> *mut u8;

    /// Resize a block, with C `realloc` semantics for null and zero.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live block from this allocator.
    unsafe fn realloc(&self, ptr: *mut u8, size: usize) -> *mut u8;

    /// Bytes actually reserved for a live block.
    ///
    /// # Safety
    ///
    /// `ptr` must be a live block from this allocator.
    unsafe fn usable_size(&self, ptr: NonNull<u8>) -> usize;
}

/// Where an interceptor sends a call once its sink has seen it.
#[derive(Debug, Clone, Copy)]
pub enum Next<H, A> {
    /// Another hook link, which receives caller identity and `init`.
    Hook(H),
    /// A terminal allocator. `init` stops here.
    Terminal(A),
}

/// A [`Next`] that always ends at a terminal allocator.
pub type Terminal<A> = Next<Unlinked, A>;

/// A [`Next`] that always forwards to another hook link.
pub type Link<H> = Next<H, Unlinked>;

impl<A> Next<Unlinked, A> {
    /// End the chain at `allocator`.
    pub const fn terminal(allocator: A) -> Self {
        Next::Terminal(allocator)
    }
}

impl<H> Next<H, Unlinked> {
    /// Forward to another link.
    pub const fn hook(hooks: H) -> Self {
        Next::Hook(hooks)
    }
}

unsafe impl<H: AllocatorHooks, A: RawAllocator> AllocatorHooks for Next<H, A> {
    #[inline]
    fn init(&self) {
        match self {
            Next::Hook(hooks) => hooks.init(),
            Next::Terminal(_) => {}
        }
    }

    #[inline]
    fn malloc(&self, size: usize, caller: Caller) -> *mut u8 {
        match self {
            Next::Hook(hooks) => hooks.malloc(size, caller),
            Next::Terminal(alloc) => alloc.malloc(size),
        }
    }

    #[inline]
    unsafe fn free(&self, ptr: *mut u8, caller: Caller) {
        match self {
            Next::Hook(hooks) => hooks.free(ptr, caller),
            Next::Terminal(alloc) => alloc.free(ptr),
        }
    }

    #[inline]
    fn memalign(&self, alignment: usize, size: usize, caller: Caller) -> *mut u8 {
        match self {
            Next::Hook(hooks) => hooks.memalign(alignment, size, caller),
            Next::Terminal(alloc) => alloc.memalign(alignment, size),
        }
    }

    #[inline]
    unsafe fn realloc(&self, ptr: *mut u8, size: usize, caller: Caller) -> *mut u8 {
        match self {
            Next::Hook(hooks) => hooks.realloc(ptr, size, caller),
            Next::Terminal(alloc) => alloc.realloc(ptr, size),
        }
    }

    #[inline]
    unsafe fn usable_size(&self, ptr: NonNull<u8>) -> usize {
        match self {
            Next::Hook(hooks) => hooks.usable_size(ptr),
            Next::Terminal(alloc) => alloc.usable_size(ptr),
        }
    }
}

/// The side of a [`Next`] that is never used. Uninhabited.
#[derive(Debug, Clone, Copy)]
pub enum Unlinked {}

unsafe impl AllocatorHooks for Unlinked {
    fn init(&self) {
        match *self {}
    }

    fn malloc(&self, _size: usize, _caller: Caller) -> *mut u8 {
        match *self {}
    }

    unsafe fn free(&self, _ptr: *mut u8, _caller: Caller) {
        match *self {}
    }

    fn memalign(&self, _alignment: usize, _size: usize, _caller: Caller) -> *mut u8 {
        match *self {}
    }

    unsafe fn realloc(&self, _ptr: *mut u8, _size: usize, _caller: Caller) -> *mut u8 {
        match *self {}
    }

    unsafe fn usable_size(&self, _ptr: NonNull<u8>) -> usize {
        match *self {}
    }
}

unsafe impl RawAllocator for Unlinked {
    fn malloc(&self, _size: usize) -> *mut u8 {
        match *self {}
    }

    unsafe fn free(&self, _ptr: *mut u8) {
        match *self {}
    }

    fn memalign(&self, _alignment: usize, _size: usize) -> *mut u8 {
        match *self {}
    }

    unsafe fn realloc(&self, _ptr: *mut u8, _size: usize) -> *mut u8 {
        match *self {}
    }

    unsafe fn usable_size(&self, _ptr: NonNull<u8>) -> usize {
        match *self {}
    }
}
