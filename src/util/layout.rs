//! Alignment arithmetic.

/// Align a size up to the given alignment.
///
/// `align` must be a power of two. Returns `None` on overflow.
#[inline]
pub const fn align_up(size: usize, align: usize) -> Option<usize> {
    match size.checked_add(align - 1) {
        Some(padded) => Some(padded & !(align - 1)),
        None => None,
    }
}
