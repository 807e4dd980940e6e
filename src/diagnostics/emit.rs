//! Diagnostic emission backend.
//!
//! Diagnostics go to stderr, or through `log` when that feature is on.
//! Emission happens inside allocation calls, so nothing here allocates:
//! context is passed as `fmt::Arguments` and written straight out.

use std::fmt;
#[cfg(all(any(debug_assertions, feature = "diagnostics"), not(feature = "log")))]
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use super::kind::Diagnostic;
use super::strict::strict_mode;

/// Global flag to suppress diagnostic output (for testing).
static DIAGNOSTICS_SUPPRESSED: AtomicBool = AtomicBool::new(false);

/// Suppress all diagnostic output.
pub fn suppress_diagnostics(suppress: bool) {
    DIAGNOSTICS_SUPPRESSED.store(suppress, Ordering::Relaxed);
}

/// Check if diagnostics are suppressed.
pub fn is_suppressed() -> bool {
    DIAGNOSTICS_SUPPRESSED.load(Ordering::Relaxed)
}

/// Emit a diagnostic.
///
/// In release builds without the `diagnostics` feature, output is skipped but
/// strict mode still applies.
pub fn emit(diag: &Diagnostic) {
    emit_inner(diag, None);
}

/// Emit a diagnostic with additional runtime context.
pub fn emit_with_context(diag: &Diagnostic, context: fmt::Arguments<'_>) {
    emit_inner(diag, Some(context));
}

/// Write a diagnostic without consulting strict mode.
///
/// Interceptors report through this: they run inside allocation calls,
/// where unwinding is not allowed, and what happens after a contract
/// violation is up to the link's [`ContractPolicy`](crate::ContractPolicy).
pub fn report_with_context(diag: &Diagnostic, context: fmt::Arguments<'_>) {
    write_unless_suppressed(diag, Some(context));
}

fn emit_inner(diag: &Diagnostic, context: Option<fmt::Arguments<'_>>) {
    write_unless_suppressed(diag, context);

    if strict_mode().is_fatal(diag.kind) {
        match context {
            Some(context) => panic!(
                "[allochook][{}] {}\nContext: {}\nStrict mode enabled - diagnostics are fatal.",
                diag.code, diag.message, context
            ),
            None => panic!(
                "[allochook][{}] {}\nStrict mode enabled - diagnostics are fatal.",
                diag.code, diag.message
            ),
        }
    }
}

#[inline]
fn write_unless_suppressed(diag: &Diagnostic, context: Option<fmt::Arguments<'_>>) {
    if !is_suppressed() {
        #[cfg(any(debug_assertions, feature = "diagnostics"))]
        write_out(diag, context);
    }
    #[cfg(not(any(debug_assertions, feature = "diagnostics")))]
    let _ = (diag, context);
}

#[cfg(all(any(debug_assertions, feature = "diagnostics"), not(feature = "log")))]
fn write_out(diag: &Diagnostic, context: Option<fmt::Arguments<'_>>) {
    let mut stderr = std::io::stderr().lock();

    let _ = writeln!(
        stderr,
        "[allochook][{}] {}: {}",
        diag.code,
        diag.kind.prefix(),
        diag.message
    );
    if let Some(context) = context {
        let _ = writeln!(stderr, "  context: {}", context);
    }
    if let Some(note) = diag.note {
        let _ = writeln!(stderr, "  note: {}", note);
    }
    if let Some(help) = diag.help {
        let _ = writeln!(stderr, "  help: {}", help);
    }
    let _ = writeln!(stderr);
}

#[cfg(all(any(debug_assertions, feature = "diagnostics"), feature = "log"))]
fn write_out(diag: &Diagnostic, context: Option<fmt::Arguments<'_>>) {
    use super::kind::DiagnosticKind;

    match (diag.kind, context) {
        (DiagnosticKind::Error, Some(ctx)) => {
            log::error!(target: "allochook", "[{}] {} ({})", diag.code, diag.message, ctx)
        }
        (DiagnosticKind::Error, None) => {
            log::error!(target: "allochook", "[{}] {}", diag.code, diag.message)
        }
        (DiagnosticKind::Warning, Some(ctx)) => {
            log::warn!(target: "allochook", "[{}] {} ({})", diag.code, diag.message, ctx)
        }
        (DiagnosticKind::Warning, None) => {
            log::warn!(target: "allochook", "[{}] {}", diag.code, diag.message)
        }
        (DiagnosticKind::Note | DiagnosticKind::Help, _) => {
            log::info!(target: "allochook", "[{}] {}", diag.code, diag.message)
        }
    }

    if let Some(note) = diag.note {
        log::info!(target: "allochook", "  note: {}", note);
    }
    if let Some(help) = diag.help {
        log::info!(target: "allochook", "  help: {}", help);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::kind::{DiagnosticKind, AH002};
    use crate::diagnostics::strict::{StrictMode, StrictModeGuard};

    #[test]
    fn test_suppression() {
        let note = Diagnostic {
            kind: DiagnosticKind::Note,
            code: "AH000",
            message: "suppressed",
            note: None,
            help: None,
        };
        suppress_diagnostics(true);
        assert!(is_suppressed());
        emit_with_context(&note, format_args!("size {} -> {}", 64, 32));
        suppress_diagnostics(false);
        assert!(!is_suppressed());
    }

    #[test]
    fn test_report_is_never_fatal() {
        let _guard = StrictModeGuard::new(StrictMode::PanicOnWarning);
        report_with_context(&AH002, format_args!("size {} -> {}", 64, 32));
    }
}
