//! One link of an interception chain.
//!
//! An [`Interceptor`] wraps the next link, fires its sink's events around
//! every call, and translates pointers between what the next link hands out
//! and what the caller sees. It keeps no state between calls: everything it
//! owns is wiring, fixed at construction.

use std::fmt;
use std::ptr::{self, NonNull};

use super::chain::AllocatorHooks;
use super::config::{ContractPolicy, HookConfig};
use super::request::{AllocRequest, Caller, POINTER_ALIGN};
use super::sink::EventSink;
use super::translate::{AddressTranslator, Identity};
use crate::diagnostics::macros::{ah_report, hook_trace};

/// The allocator primitive an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOp {
    /// `malloc`
    Malloc,
    /// `free`
    Free,
    /// `memalign`
    Memalign,
    /// `realloc`
    Realloc,
}

impl fmt::Display for HookOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HookOp::Malloc => "malloc",
            HookOp::Free => "free",
            HookOp::Memalign => "memalign",
            HookOp::Realloc => "realloc",
        })
    }
}

/// Which behavior a `realloc` call degenerates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReallocCase {
    /// Null pointer: behaves exactly like `malloc`.
    AsMalloc,
    /// Non-null pointer, zero size: behaves like `free`.
    AsFree(NonNull<u8>),
    /// Non-null pointer, non-zero size: a real resize.
    Genuine(NonNull<u8>),
}

impl ReallocCase {
    /// Classify a `realloc(user_ptr, size)` call.
    #[inline]
    pub fn classify(user_ptr: *mut u8, size: usize) -> Self {
        match NonNull::new(user_ptr) {
            None => ReallocCase::AsMalloc,
            Some(user) if size == 0 => ReallocCase::AsFree(user),
            Some(user) => ReallocCase::Genuine(user),
        }
    }
}

/// An interception link: sink + next link + address translator.
///
/// `N` is usually a [`Next`](crate::Next): either another interceptor or a
/// terminal allocator. Every `Interceptor` is itself an
/// [`AllocatorHooks`], so links nest into chains of any length.
///
/// # Example
///
/// ```rust
/// use allochook::{Caller, CountingSink, Interceptor, Next};
/// # #[cfg(unix)] {
/// use allochook::SystemAllocator;
///
/// let hooks = Interceptor::new(CountingSink::new(), Next::terminal(SystemAllocator));
/// hooks.init();
///
/// let p = hooks.malloc(64, Caller::UNKNOWN);
/// assert!(!p.is_null());
/// unsafe { hooks.free(p, Caller::UNKNOWN) };
///
/// assert_eq!(hooks.sink().stats().allocations, 1);
/// assert_eq!(hooks.sink().stats().frees, 1);
/// # }
/// ```
pub struct Interceptor<S, N, T = Identity> {
    sink: S,
    next: N,
    translator: T,
    config: HookConfig,
}

impl<S, N> Interceptor<S, N, Identity> {
    /// A link with identity translation and the default config.
    ///
    /// `const`, so a whole chain can live in a `static`.
    pub const fn new(sink: S, next: N) -> Self {
        Self {
            sink,
            next,
            translator: Identity,
            config: HookConfig::new(),
        }
    }
}

impl<S, N, T> Interceptor<S, N, T> {
    /// A link built from every part.
    pub const fn from_parts(sink: S, next: N, translator: T, config: HookConfig) -> Self {
        Self {
            sink,
            next,
            translator,
            config,
        }
    }

    /// Replace the config.
    pub const fn with_config(mut self, config: HookConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the address translator.
    pub fn with_translator<U>(self, translator: U) -> Interceptor<S, N, U> {
        Interceptor {
            sink: self.sink,
            next: self.next,
            translator,
            config: self.config,
        }
    }

    /// This link's event sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// The link calls are forwarded to.
    pub fn next(&self) -> &N {
        &self.next
    }

    /// This link's address translator.
    pub fn translator(&self) -> &T {
        &self.translator
    }

    /// This link's config.
    pub fn config(&self) -> &HookConfig {
        &self.config
    }
}

impl<S, N, T> Interceptor<S, N, T>
where
    S: EventSink,
    N: AllocatorHooks,
    T: AddressTranslator,
{
    /// Fire `post_init` on this link's sink, then initialise the next link.
    pub fn init(&self) {
        self.sink.post_init();
        self.next.init();
    }

    /// Intercept `malloc(size)`.
    ///
    /// Returns null, with no post event, if the next link fails.
    pub fn malloc(&self, size: usize, caller: Caller) -> *mut u8 {
        hook_trace!(self.config, "called malloc({})", size);

        let requested = AllocRequest::plain(size);
        let modified = self.adjust(requested, caller);
        self.enforce_pointer_alignment(HookOp::Malloc, modified);

        let result = self.next.malloc(modified.size, caller);

        if let Some(alloc_ptr) = NonNull::new(result) {
            self.sink
                .post_successful_alloc(alloc_ptr, modified, requested, caller);
        }

        // SAFETY: `result` comes straight from the next link.
        let user_ptr = unsafe { self.user_ptr(result) };
        hook_trace!(
            self.config,
            "malloc({}) returned chunk at {:p} (modified size: {}, userptr: {:p})",
            size,
            result,
            modified.size,
            user_ptr
        );
        user_ptr
    }

    /// Intercept `free(user_ptr)`. Null is a no-op that fires nothing.
    ///
    /// # Safety
    ///
    /// `user_ptr` must be null or a live pointer handed out by this link.
    pub unsafe fn free(&self, user_ptr: *mut u8, caller: Caller) {
        let Some(user) = NonNull::new(user_ptr) else {
            return;
        };
        let alloc_ptr = self.translator.to_alloc(user);
        hook_trace!(
            self.config,
            "freeing chunk at {:p} (userptr {:p})",
            alloc_ptr,
            user
        );

        let usable_size = self.next.usable_size(alloc_ptr);
        self.sink.pre_nonnull_free(user, usable_size);

        self.next.free(alloc_ptr.as_ptr(), caller);

        self.sink.post_nonnull_free(user);
        hook_trace!(self.config, "freed chunk at {:p}", alloc_ptr);
    }

    /// Intercept `memalign(alignment, size)`.
    ///
    /// The sink may change both size and alignment here.
    pub fn memalign(&self, alignment: usize, size: usize, caller: Caller) -> *mut u8 {
        hook_trace!(self.config, "calling memalign({}, {})", alignment, size);

        let requested = AllocRequest::aligned(alignment, size);
        let modified = self.adjust(requested, caller);
        if modified.align != requested.align && !modified.align.is_power_of_two() {
            ah_report!(
                AH003,
                "{}: memalign alignment {} -> {}",
                self.config.label,
                requested.align,
                modified.align
            );
        }

        let result = self.next.memalign(modified.align, modified.size, caller);

        if let Some(alloc_ptr) = NonNull::new(result) {
            self.sink
                .post_successful_alloc(alloc_ptr, modified, requested, caller);
        }

        hook_trace!(
            self.config,
            "memalign({}, {}) returned {:p}",
            alignment,
            size,
            result
        );
        // SAFETY: `result` comes straight from the next link.
        unsafe { self.user_ptr(result) }
    }

    /// Intercept `realloc(user_ptr, size)`.
    ///
    /// See [`ReallocCase`] for how the call is split. In every case the
    /// next link's `realloc` is what gets called, including `realloc(p, 0)`.
    ///
    /// # Safety
    ///
    /// `user_ptr` must be null or a live pointer handed out by this link.
    pub unsafe fn realloc(&self, user_ptr: *mut u8, size: usize, caller: Caller) -> *mut u8 {
        match ReallocCase::classify(user_ptr, size) {
            ReallocCase::AsMalloc => self.realloc_as_malloc(size, caller),
            ReallocCase::AsFree(user) => self.realloc_as_free(user, caller),
            ReallocCase::Genuine(user) => self.realloc_genuine(user, size, caller),
        }
    }

    /// Usable size of a live block, seen from the user pointer.
    ///
    /// # Safety
    ///
    /// `user_ptr` must be a live pointer handed out by this link.
    pub unsafe fn usable_size(&self, user_ptr: NonNull<u8>) -> usize {
        let alloc_usable = self.next.usable_size(self.translator.to_alloc(user_ptr));
        self.translator.user_usable_size(alloc_usable)
    }

    /// The precondition on every pointer-aligned path: the sink left the
    /// alignment at [`POINTER_ALIGN`].
    ///
    /// What a violation does is set by [`ContractPolicy`]. The next
    /// allocator is never called with a request that failed the check.
    #[inline]
    pub fn enforce_pointer_alignment(&self, op: HookOp, modified: AllocRequest) {
        if modified.is_pointer_aligned() || !self.config.contract.is_checked() {
            return;
        }
        self.alignment_violation(op, modified)
    }

    #[cold]
    #[inline(never)]
    fn alignment_violation(&self, op: HookOp, modified: AllocRequest) -> ! {
        ah_report!(
            AH001,
            "{}: {} alignment {} -> {}",
            self.config.label,
            op,
            POINTER_ALIGN,
            modified.align
        );
        match self.config.contract {
            ContractPolicy::Panic => panic!(
                "[allochook][AH001] {}: sink changed {} alignment from {} to {}",
                self.config.label, op, POINTER_ALIGN, modified.align
            ),
            ContractPolicy::Abort | ContractPolicy::DebugAbort => std::process::abort(),
        }
    }

    /// Run the sink's size/alignment adjustment.
    #[inline]
    fn adjust(&self, requested: AllocRequest, caller: Caller) -> AllocRequest {
        let modified = self.sink.pre_alloc(requested, caller);
        if modified.size < requested.size {
            ah_report!(
                AH002,
                "{}: size {} -> {}",
                self.config.label,
                requested.size,
                modified.size
            );
        }
        modified
    }

    /// # Safety
    ///
    /// `alloc_ptr` must be null or a block the next link just returned.
    #[inline]
    unsafe fn user_ptr(&self, alloc_ptr: *mut u8) -> *mut u8 {
        match NonNull::new(alloc_ptr) {
            Some(alloc_ptr) => self.translator.to_user(alloc_ptr).as_ptr(),
            None => ptr::null_mut(),
        }
    }

    unsafe fn realloc_as_malloc(&self, size: usize, caller: Caller) -> *mut u8 {
        hook_trace!(self.config, "realloc(NULL, {}) behaving as malloc", size);

        let requested = AllocRequest::plain(size);
        let modified = self.adjust(requested, caller);
        self.enforce_pointer_alignment(HookOp::Realloc, modified);

        let result = self.next.realloc(ptr::null_mut(), modified.size, caller);

        if let Some(alloc_ptr) = NonNull::new(result) {
            self.sink
                .post_successful_alloc(alloc_ptr, modified, requested, caller);
        }
        self.user_ptr(result)
    }

    unsafe fn realloc_as_free(&self, user: NonNull<u8>, caller: Caller) -> *mut u8 {
        let alloc_ptr = self.translator.to_alloc(user);
        hook_trace!(
            self.config,
            "realloc({:p}, 0) behaving as free (allocptr: {:p})",
            user,
            alloc_ptr
        );

        let usable_size = self.next.usable_size(alloc_ptr);
        self.sink.pre_nonnull_free(user, usable_size);

        let result = self.next.realloc(alloc_ptr.as_ptr(), 0, caller);

        self.sink.post_nonnull_free(user);
        self.user_ptr(result)
    }

    unsafe fn realloc_genuine(&self, user: NonNull<u8>, size: usize, caller: Caller) -> *mut u8 {
        let alloc_ptr = self.translator.to_alloc(user);
        hook_trace!(
            self.config,
            "reallocating user pointer {:p} (allocptr: {:p}) to requested size {}",
            user,
            alloc_ptr,
            size
        );

        // Read before the block can move or shrink: the sink may need the
        // old extent to find its trailer.
        let old_usable_size = self.next.usable_size(alloc_ptr);
        self.sink.pre_nonnull_nonzero_realloc(user, size, caller);

        let requested = AllocRequest::plain(size);
        let modified = self.adjust(requested, caller);
        self.enforce_pointer_alignment(HookOp::Realloc, modified);

        let result = NonNull::new(self.next.realloc(alloc_ptr.as_ptr(), modified.size, caller));

        self.sink.post_nonnull_nonzero_realloc(
            user,
            modified.size,
            old_usable_size,
            caller,
            result,
        );

        let new_user = match result {
            Some(result) => self.translator.to_user(result).as_ptr(),
            None => ptr::null_mut(),
        };
        hook_trace!(
            self.config,
            "reallocated user chunk at {:p}, new user chunk at {:p} (requested size {}, modified size {})",
            user,
            new_user,
            size,
            modified.size
        );
        new_user
    }
}

unsafe impl<S, N, T> AllocatorHooks for Interceptor<S, N, T>
where
    S: EventSink,
    N: AllocatorHooks,
    T: AddressTranslator,
{
    #[inline]
    fn init(&self) {
        Interceptor::init(self)
    }

    #[inline]
    fn malloc(&self, size: usize, caller: Caller) -> *mut u8 {
        Interceptor::malloc(self, size, caller)
    }

    #[inline]
    unsafe fn free(&self, ptr: *mut u8, caller: Caller) {
        Interceptor::free(self, ptr, caller)
    }

    #[inline]
    fn memalign(&self, alignment: usize, size: usize, caller: Caller) -> *mut u8 {
        Interceptor::memalign(self, alignment, size, caller)
    }

    #[inline]
    unsafe fn realloc(&self, ptr: *mut u8, size: usize, caller: Caller) -> *mut u8 {
        Interceptor::realloc(self, ptr, size, caller)
    }

    #[inline]
    unsafe fn usable_size(&self, ptr: NonNull<u8>) -> usize {
        Interceptor::usable_size(self, ptr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::chain::{Next, RawAllocator};
    use crate::api::sink::NoopSink;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Hands out fake, never-dereferenced addresses 256 bytes apart.
    struct FakeAlloc {
        cursor: AtomicUsize,
        limit: usize,
    }

    impl FakeAlloc {
        fn new(limit: usize) -> Self {
            Self {
                cursor: AtomicUsize::new(0x10_000),
                limit,
            }
        }

        fn bump(&self, size: usize) -> *mut u8 {
            if size > self.limit {
                return ptr::null_mut();
            }
            self.cursor.fetch_add(0x100, Ordering::Relaxed) as *mut u8
        }
    }

    unsafe impl RawAllocator for FakeAlloc {
        fn malloc(&self, size: usize) -> *mut u8 {
            self.bump(size)
        }

        unsafe fn free(&self, _ptr: *mut u8) {}

        fn memalign(&self, _alignment: usize, size: usize) -> *mut u8 {
            self.bump(size)
        }

        unsafe fn realloc(&self, ptr: *mut u8, size: usize) -> *mut u8 {
            if size == 0 && !ptr.is_null() {
                return ptr::null_mut();
            }
            self.bump(size)
        }

        unsafe fn usable_size(&self, _ptr: NonNull<u8>) -> usize {
            0x100
        }
    }

    struct Realigning;

    impl EventSink for Realigning {
        fn pre_alloc(&self, request: AllocRequest, _caller: Caller) -> AllocRequest {
            AllocRequest::aligned(request.align * 2, request.size)
        }
    }

    #[test]
    fn test_classify() {
        let p = 0x40 as *mut u8;
        assert_eq!(ReallocCase::classify(ptr::null_mut(), 0), ReallocCase::AsMalloc);
        assert_eq!(ReallocCase::classify(ptr::null_mut(), 8), ReallocCase::AsMalloc);
        assert!(matches!(ReallocCase::classify(p, 0), ReallocCase::AsFree(u) if u.as_ptr() == p));
        assert!(matches!(ReallocCase::classify(p, 8), ReallocCase::Genuine(u) if u.as_ptr() == p));
    }

    #[test]
    fn test_failed_malloc_returns_null() {
        let hooks = Interceptor::new(NoopSink, Next::terminal(FakeAlloc::new(1024)));
        assert!(hooks.malloc(4096, Caller::UNKNOWN).is_null());
        assert!(!hooks.malloc(16, Caller::UNKNOWN).is_null());
    }

    #[test]
    fn test_memalign_may_change_alignment() {
        let hooks = Interceptor::new(Realigning, Next::terminal(FakeAlloc::new(1024)))
            .with_config(HookConfig::strict());
        assert!(!hooks.memalign(64, 16, Caller::UNKNOWN).is_null());
    }

    #[test]
    #[should_panic(expected = "AH001")]
    fn test_malloc_alignment_violation_panics() {
        let hooks = Interceptor::new(Realigning, Next::terminal(FakeAlloc::new(1024)))
            .with_config(HookConfig::strict().with_label("realigning"));
        hooks.malloc(16, Caller::UNKNOWN);
    }

    #[test]
    #[should_panic(expected = "AH001")]
    fn test_realloc_alignment_violation_panics() {
        let hooks = Interceptor::new(Realigning, Next::terminal(FakeAlloc::new(1024)))
            .with_config(HookConfig::strict());
        unsafe { hooks.realloc(0x40 as *mut u8, 32, Caller::UNKNOWN) };
    }

    #[test]
    fn test_zero_size_realloc_skips_alignment_check() {
        let hooks = Interceptor::new(Realigning, Next::terminal(FakeAlloc::new(1024)))
            .with_config(HookConfig::strict());
        let result = unsafe { hooks.realloc(0x40 as *mut u8, 0, Caller::UNKNOWN) };
        assert!(result.is_null());
    }

    #[test]
    fn test_hook_op_display() {
        assert_eq!(HookOp::Memalign.to_string(), "memalign");
        assert_eq!(HookOp::Free.to_string(), "free");
    }
}
