//! Call-scoped request data.

use std::fmt;

/// Alignment implied by the plain `malloc`/`realloc` primitives: the size of
/// a pointer on the target.
pub const POINTER_ALIGN: usize = std::mem::size_of::<*const ()>();

/// The size and alignment of one allocation request.
///
/// Sinks receive the caller's request in [`EventSink::pre_alloc`] and return
/// the request that should actually reach the next allocator.
///
/// [`EventSink::pre_alloc`]: crate::EventSink::pre_alloc
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AllocRequest {
    /// Requested size in bytes.
    pub size: usize,
    /// Requested alignment in bytes.
    pub align: usize,
}

impl AllocRequest {
    /// A pointer-aligned request, as made by `malloc` and `realloc`.
    #[inline]
    pub const fn plain(size: usize) -> Self {
        Self {
            size,
            align: POINTER_ALIGN,
        }
    }

    /// An explicitly aligned request, as made by `memalign`.
    #[inline]
    pub const fn aligned(align: usize, size: usize) -> Self {
        Self { size, align }
    }

    /// Same alignment, `extra` more bytes. Saturates instead of wrapping, so
    /// an absurd request stays absurd and the allocator rejects it.
    #[inline]
    pub const fn grow(self, extra: usize) -> Self {
        Self {
            size: self.size.saturating_add(extra),
            align: self.align,
        }
    }

    /// Whether this request carries the implicit pointer alignment.
    #[inline]
    pub const fn is_pointer_aligned(&self) -> bool {
        self.align == POINTER_ALIGN
    }
}

/// Identity of the code that made an allocation call.
///
/// Usually a return address. The interceptor only passes it along; sinks
/// may use it to attribute allocations.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Caller(usize);

impl Caller {
    /// No caller information available.
    pub const UNKNOWN: Caller = Caller(0);

    /// Wrap a raw caller address.
    #[inline]
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    /// Wrap a code pointer, such as a return address.
    #[inline]
    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Self(ptr as usize)
    }

    /// The raw caller address.
    #[inline]
    pub const fn addr(&self) -> usize {
        self.0
    }

    /// Whether caller information is missing.
    #[inline]
    pub const fn is_unknown(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            f.write_str("Caller(?)")
        } else {
            write!(f, "Caller({:#x})", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_request_is_pointer_aligned() {
        let req = AllocRequest::plain(24);
        assert_eq!(req.align, POINTER_ALIGN);
        assert!(req.is_pointer_aligned());
        assert!(!AllocRequest::aligned(64, 24).is_pointer_aligned());
    }

    #[test]
    fn test_grow_saturates() {
        assert_eq!(AllocRequest::plain(64).grow(16).size, 80);
        assert_eq!(AllocRequest::plain(usize::MAX - 1).grow(16).size, usize::MAX);
    }

    #[test]
    fn test_caller_debug() {
        assert_eq!(format!("{:?}", Caller::UNKNOWN), "Caller(?)");
        assert_eq!(format!("{:?}", Caller::new(0x40)), "Caller(0x40)");
        assert!(Caller::default().is_unknown());
    }
}
