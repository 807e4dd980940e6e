//! Whether [`emit`](super::emit) treats diagnostics as fatal.
//!
//! Strict mode only governs diagnostics raised through `emit`, for example
//! by a sink checking its own invariants outside an allocation call. The
//! interceptor reports its contract diagnostics without consulting it; a
//! link's [`ContractPolicy`](crate::ContractPolicy) alone decides what a
//! violation does.

use std::sync::atomic::{AtomicU8, Ordering};

use super::kind::DiagnosticKind;

/// How `emit` reacts to a diagnostic once it has been written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrictMode {
    /// Write it and carry on.
    #[default]
    Warn,
    /// Panic after writing an error.
    PanicOnError,
    /// Panic after writing an error or a warning.
    PanicOnWarning,
}

impl StrictMode {
    /// Parse a setting: `0`/`warn`, `1`/`error`, `2`/`warning`.
    pub fn parse(val: &str) -> Option<Self> {
        match val.trim().to_ascii_lowercase().as_str() {
            "0" | "warn" | "false" => Some(StrictMode::Warn),
            "1" | "error" | "true" => Some(StrictMode::PanicOnError),
            "2" | "warning" | "all" => Some(StrictMode::PanicOnWarning),
            _ => None,
        }
    }

    /// Whether a diagnostic of `kind` is fatal under this mode.
    pub const fn is_fatal(self, kind: DiagnosticKind) -> bool {
        match (self, kind) {
            (StrictMode::Warn, _) => false,
            (StrictMode::PanicOnError, kind) => matches!(kind, DiagnosticKind::Error),
            (StrictMode::PanicOnWarning, kind) => {
                matches!(kind, DiagnosticKind::Error | DiagnosticKind::Warning)
            }
        }
    }
}

static STRICT_MODE: AtomicU8 = AtomicU8::new(0);

/// Set the process-wide strict mode.
pub fn set_strict_mode(mode: StrictMode) {
    STRICT_MODE.store(mode as u8, Ordering::Relaxed);
}

/// The process-wide strict mode.
pub fn strict_mode() -> StrictMode {
    match STRICT_MODE.load(Ordering::Relaxed) {
        1 => StrictMode::PanicOnError,
        2 => StrictMode::PanicOnWarning,
        _ => StrictMode::Warn,
    }
}

/// Sets a strict mode and restores the previous one on drop.
pub struct StrictModeGuard {
    previous: StrictMode,
}

impl StrictModeGuard {
    /// Switch to `mode` until the guard is dropped.
    pub fn new(mode: StrictMode) -> Self {
        let previous = strict_mode();
        set_strict_mode(mode);
        Self { previous }
    }
}

impl Drop for StrictModeGuard {
    fn drop(&mut self) {
        set_strict_mode(self.previous);
    }
}

/// Read `ALLOCHOOK_STRICT` (see [`StrictMode::parse`]); unknown values mean
/// [`StrictMode::Warn`].
///
/// Reading the environment allocates; call this while wiring the chain.
pub fn init_from_env() {
    if let Ok(val) = std::env::var("ALLOCHOOK_STRICT") {
        set_strict_mode(StrictMode::parse(&val).unwrap_or_default());
    }
}
