//! Interception statistics.

use crate::util::size::format_bytes;

/// Snapshot of what a [`CountingSink`](crate::CountingSink) has seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HookStats {
    /// `post_init` events.
    pub inits: u64,

    /// `pre_alloc` events: malloc, memalign, realloc-as-malloc and genuine
    /// realloc requests.
    pub alloc_requests: u64,

    /// Successful allocations (`post_successful_alloc`).
    pub allocations: u64,

    /// Released blocks, including `realloc(p, 0)`.
    pub frees: u64,

    /// Completed genuine reallocs, successful or not.
    pub reallocs: u64,

    /// Genuine reallocs the next allocator refused.
    pub failed_reallocs: u64,

    /// Sum of caller-requested sizes over successful allocations.
    pub bytes_requested: u64,

    /// Sum of usable sizes over released blocks.
    pub bytes_released: u64,

    /// Blocks currently live, as seen through this sink.
    pub live_blocks: usize,

    /// High-water mark of `live_blocks`.
    pub peak_live_blocks: usize,
}

impl HookStats {
    /// Allocation requests the next allocator refused (malloc, memalign and
    /// realloc-as-malloc).
    pub fn failed_allocations(&self) -> u64 {
        self.alloc_requests
            .saturating_sub(self.allocations)
            .saturating_sub(self.reallocs)
    }
}

impl std::fmt::Display for HookStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Interception Statistics:")?;
        writeln!(f, "  Allocations:     {}", self.allocations)?;
        writeln!(f, "  Failed:          {}", self.failed_allocations())?;
        writeln!(f, "  Frees:           {}", self.frees)?;
        writeln!(
            f,
            "  Reallocs:        {} ({} failed)",
            self.reallocs, self.failed_reallocs
        )?;
        writeln!(
            f,
            "  Live blocks:     {} (peak {})",
            self.live_blocks, self.peak_live_blocks
        )?;
        writeln!(
            f,
            "  Requested:       {}",
            format_bytes(self.bytes_requested as usize)
        )?;
        writeln!(
            f,
            "  Released:        {}",
            format_bytes(self.bytes_released as usize)
        )?;
        Ok(())
    }
}
