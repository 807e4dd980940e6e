//! Memory poisoning for debugging.
//!
//! Fills fresh and freed memory with known patterns so that reads of
//! uninitialized or freed data stand out.

use std::ptr::NonNull;

use crate::api::request::{AllocRequest, Caller};
use crate::api::sink::EventSink;

/// Pattern written over memory that has been freed.
pub const FREED_PATTERN: u8 = 0xCD;

/// Pattern written over freshly allocated memory.
pub const UNINIT_PATTERN: u8 = 0xAB;

/// Poison a region of memory with the freed pattern.
///
/// # Safety
///
/// The memory region must be valid and writable.
pub unsafe fn poison_freed(ptr: *mut u8, size: usize) {
    std::ptr::write_bytes(ptr, FREED_PATTERN, size);
}

/// Poison a region of memory with the uninitialized pattern.
///
/// # Safety
///
/// The memory region must be valid and writable.
pub unsafe fn poison_uninit(ptr: *mut u8, size: usize) {
    std::ptr::write_bytes(ptr, UNINIT_PATTERN, size);
}

/// Check if a region is entirely filled with `pattern`.
///
/// # Safety
///
/// The memory region must be valid and readable.
pub unsafe fn is_filled(ptr: *const u8, size: usize, pattern: u8) -> bool {
    std::slice::from_raw_parts(ptr, size)
        .iter()
        .all(|&byte| byte == pattern)
}

/// Writes [`UNINIT_PATTERN`] over new blocks and [`FREED_PATTERN`] over
/// blocks about to be freed.
///
/// On a genuine realloc that grew the block, only the new tail is
/// poisoned; the preserved prefix is left alone.
///
/// Writes go through the pointers the sink is handed, so the link must use
/// the [`Identity`](crate::Identity) translator and a next link that returns
/// real memory.
pub struct PoisonSink {
    _private: (),
}

impl PoisonSink {
    /// Create a poisoning sink.
    ///
    /// # Safety
    ///
    /// The sink must only be placed on an [`Interceptor`](crate::Interceptor)
    /// with the identity translator, whose next link hands out real,
    /// writable blocks of at least the reported sizes.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl EventSink for PoisonSink {
    fn post_successful_alloc(
        &self,
        alloc_ptr: NonNull<u8>,
        _modified: AllocRequest,
        requested: AllocRequest,
        _caller: Caller,
    ) {
        // SAFETY: guaranteed by the contract of `PoisonSink::new`.
        unsafe { poison_uninit(alloc_ptr.as_ptr(), requested.size) };
    }

    fn pre_nonnull_free(&self, user_ptr: NonNull<u8>, usable_size: usize) {
        // SAFETY: guaranteed by the contract of `PoisonSink::new`.
        unsafe { poison_freed(user_ptr.as_ptr(), usable_size) };
    }

    fn post_nonnull_nonzero_realloc(
        &self,
        _user_ptr: NonNull<u8>,
        modified_size: usize,
        old_usable_size: usize,
        _caller: Caller,
        result: Option<NonNull<u8>>,
    ) {
        let Some(new_ptr) = result else {
            return;
        };
        if modified_size > old_usable_size {
            // SAFETY: the block now holds at least `modified_size` bytes.
            unsafe {
                poison_uninit(
                    new_ptr.as_ptr().add(old_usable_size),
                    modified_size - old_usable_size,
                )
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poison_fresh_and_freed() {
        let mut block = [0u8; 32];
        let ptr = NonNull::new(block.as_mut_ptr()).unwrap();
        let sink = unsafe { PoisonSink::new() };

        let req = AllocRequest::plain(16);
        sink.post_successful_alloc(ptr, req, req, Caller::UNKNOWN);
        assert!(block[..16].iter().all(|&b| b == UNINIT_PATTERN));
        assert_eq!(block[16], 0);

        let ptr = NonNull::new(block.as_mut_ptr()).unwrap();
        sink.pre_nonnull_free(ptr, 32);
        assert!(unsafe { is_filled(block.as_ptr(), 32, FREED_PATTERN) });
    }

    #[test]
    fn test_realloc_poisons_only_tail() {
        let mut block = [7u8; 64];
        let ptr = NonNull::new(block.as_mut_ptr()).unwrap();
        let sink = unsafe { PoisonSink::new() };

        sink.post_nonnull_nonzero_realloc(ptr, 48, 16, Caller::UNKNOWN, Some(ptr));

        assert!(block[..16].iter().all(|&b| b == 7));
        assert!(block[16..48].iter().all(|&b| b == UNINIT_PATTERN));
        assert!(block[48..].iter().all(|&b| b == 7));
    }

    #[test]
    fn test_failed_realloc_untouched() {
        let mut block = [7u8; 16];
        let ptr = NonNull::new(block.as_mut_ptr()).unwrap();
        let sink = unsafe { PoisonSink::new() };

        sink.post_nonnull_nonzero_realloc(ptr, 16, 8, Caller::UNKNOWN, None);
        assert!(block.iter().all(|&b| b == 7));
    }
}
