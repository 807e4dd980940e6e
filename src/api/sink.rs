//! The instrumentation plugin interface.

use std::ptr::NonNull;
use std::sync::Arc;

use super::request::{AllocRequest, Caller};

/// Callbacks fired around every intercepted allocator call.
///
/// Every callback has a no-op default, so instrumentation only implements
/// the events it cares about.
///
/// # Pairing
///
/// | call | pre | post |
/// |------|-----|------|
/// | `malloc`, `memalign`, `realloc(null, n)` | `pre_alloc` | `post_successful_alloc`, only on success |
/// | `free(p)`, `realloc(p, 0)` | `pre_nonnull_free` | `post_nonnull_free`, always |
/// | `realloc(p, n)` | `pre_nonnull_nonzero_realloc`, then `pre_alloc` | `post_nonnull_nonzero_realloc`, always |
///
/// # Reentrancy
///
/// Callbacks run synchronously inside the intercepted call. A callback must
/// not allocate through the same interceptor it is attached to, or the call
/// recurses through its own events. Sinks that need memory must get it from
/// an un-intercepted path.
///
/// # Concurrency
///
/// The interceptor adds no locking. A sink shared across threads protects
/// its own state.
pub trait EventSink {
    /// The link has been initialised.
    fn post_init(&self) {}

    /// Adjust a request before it reaches the next allocator.
    ///
    /// May grow `size` (to reserve room for a header or trailer). May change
    /// `align` only for memalign requests; on malloc and realloc paths a
    /// changed alignment is a contract violation.
    fn pre_alloc(&self, request: AllocRequest, caller: Caller) -> AllocRequest {
        let _ = caller;
        request
    }

    /// The next allocator returned `alloc_ptr` for the `modified` request.
    fn post_successful_alloc(
        &self,
        alloc_ptr: NonNull<u8>,
        modified: AllocRequest,
        requested: AllocRequest,
        caller: Caller,
    ) {
        let _ = (alloc_ptr, modified, requested, caller);
    }

    /// `user_ptr` is about to be released. `usable_size` is the usable size
    /// of its allocation, read while the block is still live.
    fn pre_nonnull_free(&self, user_ptr: NonNull<u8>, usable_size: usize) {
        let _ = (user_ptr, usable_size);
    }

    /// `user_ptr` has been released. The block must not be touched.
    fn post_nonnull_free(&self, user_ptr: NonNull<u8>) {
        let _ = user_ptr;
    }

    /// `user_ptr` is about to be resized to `requested_size` bytes.
    fn pre_nonnull_nonzero_realloc(
        &self,
        user_ptr: NonNull<u8>,
        requested_size: usize,
        caller: Caller,
    ) {
        let _ = (user_ptr, requested_size, caller);
    }

    /// The resize of `user_ptr` finished.
    ///
    /// `result` is the new allocation pointer, or `None` if the next
    /// allocator failed, in which case the original block is still live and
    /// unchanged. `old_usable_size` was captured before the resize.
    fn post_nonnull_nonzero_realloc(
        &self,
        user_ptr: NonNull<u8>,
        modified_size: usize,
        old_usable_size: usize,
        caller: Caller,
        result: Option<NonNull<u8>>,
    ) {
        let _ = (user_ptr, modified_size, old_usable_size, caller, result);
    }
}

/// Sink that observes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {}

macro_rules! forward_sink {
    ($($target:ty),+ $(,)?) => {$(
        impl<S: EventSink + ?Sized> EventSink for $target {
            #[inline]
            fn post_init(&self) {
                (**self).post_init()
            }

            #[inline]
            fn pre_alloc(&self, request: AllocRequest, caller: Caller) -> AllocRequest {
                (**self).pre_alloc(request, caller)
            }

            #[inline]
            fn post_successful_alloc(
                &self,
                alloc_ptr: NonNull<u8>,
                modified: AllocRequest,
                requested: AllocRequest,
                caller: Caller,
            ) {
                (**self).post_successful_alloc(alloc_ptr, modified, requested, caller)
            }

            #[inline]
            fn pre_nonnull_free(&self, user_ptr: NonNull<u8>, usable_size: usize) {
                (**self).pre_nonnull_free(user_ptr, usable_size)
            }

            #[inline]
            fn post_nonnull_free(&self, user_ptr: NonNull<u8>) {
                (**self).post_nonnull_free(user_ptr)
            }

            #[inline]
            fn pre_nonnull_nonzero_realloc(
                &self,
                user_ptr: NonNull<u8>,
                requested_size: usize,
                caller: Caller,
            ) {
                (**self).pre_nonnull_nonzero_realloc(user_ptr, requested_size, caller)
            }

            #[inline]
            fn post_nonnull_nonzero_realloc(
                &self,
                user_ptr: NonNull<u8>,
                modified_size: usize,
                old_usable_size: usize,
                caller: Caller,
                result: Option<NonNull<u8>>,
            ) {
                (**self).post_nonnull_nonzero_realloc(
                    user_ptr,
                    modified_size,
                    old_usable_size,
                    caller,
                    result,
                )
            }
        }
    )+};
}

forward_sink!(&S, Box<S>, Arc<S>);
