//! Allocation pointer <-> user pointer translation.
//!
//! An interceptor hands the caller a *user pointer* and hands the next
//! allocator an *allocation pointer*. Most instrumentation keeps them equal;
//! instrumentation that hides a header in front of the user data does not.

use std::ptr::NonNull;

/// Maps allocation pointers to user pointers and back.
///
/// Null never reaches a translator; the interceptor handles it first.
///
/// # Safety
///
/// The interceptor frees and resizes whatever `to_alloc` returns, so
/// implementors must guarantee `to_alloc(to_user(p)) == p` for every block
/// the next link hands out, and that `to_user(p)` stays inside the block
/// behind `p`.
pub unsafe trait AddressTranslator {
    /// Translate an allocation pointer into the pointer the caller sees.
    ///
    /// # Safety
    ///
    /// `alloc_ptr` must be a live block returned by the next link of the
    /// interceptor this translator belongs to.
    unsafe fn to_user(&self, alloc_ptr: NonNull<u8>) -> NonNull<u8>;

    /// Translate a caller's pointer back into the allocation pointer.
    ///
    /// # Safety
    ///
    /// `user_ptr` must have come from [`to_user`](Self::to_user) on this
    /// translator, for a block that is still live.
    unsafe fn to_alloc(&self, user_ptr: NonNull<u8>) -> NonNull<u8>;

    /// Usable size seen from the user pointer, given the usable size of the
    /// underlying allocation.
    #[inline]
    fn user_usable_size(&self, alloc_usable: usize) -> usize {
        alloc_usable
    }
}

/// Allocation and user pointers are the same address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Identity;

unsafe impl AddressTranslator for Identity {
    #[inline(always)]
    unsafe fn to_user(&self, alloc_ptr: NonNull<u8>) -> NonNull<u8> {
        alloc_ptr
    }

    #[inline(always)]
    unsafe fn to_alloc(&self, user_ptr: NonNull<u8>) -> NonNull<u8> {
        user_ptr
    }
}

/// A fixed-size header sits in front of every user pointer.
///
/// ```plaintext
/// alloc_ptr                user_ptr
/// |<------- header ------->|<------ user data ------>|
/// ```
///
/// Translation is only reachable through `unsafe` calls:
///
/// ```compile_fail
/// use allochook::{AddressTranslator, HeaderOffset};
///
/// let header = unsafe { HeaderOffset::new(16) };
/// let p = std::ptr::NonNull::new(0x10 as *mut u8).unwrap();
/// let _ = header.to_alloc(p);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderOffset {
    header: usize,
}

impl HeaderOffset {
    /// Place user pointers `header` bytes past allocation pointers.
    ///
    /// Keep `header` a multiple of the alignment callers expect, or user
    /// pointers lose it.
    ///
    /// # Safety
    ///
    /// The sink on the same link must grow every request by at least
    /// `header` bytes in `pre_alloc`, so the user pointer never leaves the
    /// block.
    pub const unsafe fn new(header: usize) -> Self {
        Self { header }
    }

    /// A header able to hold `len` bytes while keeping user pointers aligned
    /// to `align`. Returns `None` if `align` is not a power of two.
    ///
    /// # Safety
    ///
    /// Same contract as [`HeaderOffset::new`], for the returned header.
    pub const unsafe fn covering(len: usize, align: usize) -> Option<Self> {
        if !align.is_power_of_two() {
            return None;
        }
        match crate::util::layout::align_up(len, align) {
            Some(header) => Some(Self { header }),
            None => None,
        }
    }

    /// Header length in bytes.
    pub const fn header(&self) -> usize {
        self.header
    }
}

unsafe impl AddressTranslator for HeaderOffset {
    #[inline]
    unsafe fn to_user(&self, alloc_ptr: NonNull<u8>) -> NonNull<u8> {
        // SAFETY: the block is at least `header` bytes (constructor
        // contract), so the offset stays inside it and cannot wrap to null.
        NonNull::new_unchecked(alloc_ptr.as_ptr().wrapping_add(self.header))
    }

    #[inline]
    unsafe fn to_alloc(&self, user_ptr: NonNull<u8>) -> NonNull<u8> {
        // SAFETY: `user_ptr` is `header` bytes past a live, non-null block.
        NonNull::new_unchecked(user_ptr.as_ptr().wrapping_sub(self.header))
    }

    #[inline]
    fn user_usable_size(&self, alloc_usable: usize) -> usize {
        alloc_usable.saturating_sub(self.header)
    }
}
