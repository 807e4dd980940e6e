//! The platform C allocator as a chain terminal.

use std::ptr::{self, NonNull};

use crate::api::chain::RawAllocator;
use crate::api::request::POINTER_ALIGN;

/// The C library's `malloc` family.
///
/// Zero-sized and `const`-constructible, so it can end a chain stored in a
/// `static`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAllocator;

impl SystemAllocator {
    /// The system allocator.
    pub const fn new() -> Self {
        SystemAllocator
    }
}

unsafe impl RawAllocator for SystemAllocator {
    #[inline]
    fn malloc(&self, size: usize) -> *mut u8 {
        // SAFETY: malloc accepts any size.
        unsafe { libc::malloc(size).cast() }
    }

    #[inline]
    unsafe fn free(&self, ptr: *mut u8) {
        libc::free(ptr.cast());
    }

    fn memalign(&self, alignment: usize, size: usize) -> *mut u8 {
        // posix_memalign wants a power of two that is a multiple of the
        // pointer size.
        let alignment = alignment.max(POINTER_ALIGN);
        if !alignment.is_power_of_two() {
            return ptr::null_mut();
        }

        let mut out: *mut libc::c_void = ptr::null_mut();
        // SAFETY: alignment was validated above and `out` is a valid slot.
        let rc = unsafe { libc::posix_memalign(&mut out, alignment, size) };
        if rc == 0 {
            out.cast()
        } else {
            ptr::null_mut()
        }
    }

    #[inline]
    unsafe fn realloc(&self, ptr: *mut u8, size: usize) -> *mut u8 {
        libc::realloc(ptr.cast(), size).cast()
    }

    #[inline]
    unsafe fn usable_size(&self, ptr: NonNull<u8>) -> usize {
        #[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd"))]
        {
            libc::malloc_usable_size(ptr.as_ptr().cast())
        }

        #[cfg(any(target_os = "macos", target_os = "ios"))]
        {
            libc::malloc_size(ptr.as_ptr().cast())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malloc_usable_free() {
        let sys = SystemAllocator::new();
        let ptr = NonNull::new(sys.malloc(100)).unwrap();
        assert_eq!(ptr.as_ptr() as usize % POINTER_ALIGN, 0);
        unsafe {
            assert!(sys.usable_size(ptr) >= 100);
            sys.free(ptr.as_ptr());
        }
    }

    #[test]
    fn test_memalign() {
        let sys = SystemAllocator::new();
        let ptr = NonNull::new(sys.memalign(256, 40)).unwrap();
        assert_eq!(ptr.as_ptr() as usize % 256, 0);
        unsafe { sys.free(ptr.as_ptr()) };

        assert!(sys.memalign(24, 40).is_null());
    }

    #[test]
    fn test_realloc_preserves_prefix() {
        let sys = SystemAllocator::new();
        unsafe {
            let ptr = sys.malloc(16);
            assert!(!ptr.is_null());
            ptr::write_bytes(ptr, 0x5A, 16);

            let grown = sys.realloc(ptr, 4096);
            assert!(!grown.is_null());
            assert!(std::slice::from_raw_parts(grown, 16).iter().all(|&b| b == 0x5A));
            sys.free(grown);
        }
    }
}
