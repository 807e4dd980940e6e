//! Internal macros for per-call tracing and coded diagnostics.

use std::fmt;
#[cfg(not(feature = "log"))]
use std::io::Write;

/// Trace one intercepted call if the link's config asks for it.
///
/// ```rust,ignore
/// hook_trace!(self.config, "called malloc({})", size);
/// ```
macro_rules! hook_trace {
    ($config:expr, $($arg:tt)+) => {{
        let config = &$config;
        if config.trace {
            $crate::diagnostics::macros::trace_line(config.label, format_args!($($arg)+));
        }
    }};
}

/// Report a predefined diagnostic with formatted context.
///
/// Never fatal, whatever the strict mode: this runs inside allocation calls.
///
/// ```rust,ignore
/// ah_report!(AH002, "{}: size {} -> {}", label, before, after);
/// ```
macro_rules! ah_report {
    ($code:ident, $($arg:tt)+) => {{
        $crate::diagnostics::emit::report_with_context(
            &$crate::diagnostics::$code,
            format_args!($($arg)+),
        );
    }};
}

pub(crate) use {ah_report, hook_trace};

/// Write a single trace line.
///
/// Goes to `log::trace!` with the `log` feature, otherwise straight to
/// stderr without buffering or allocation.
pub(crate) fn trace_line(label: &str, line: fmt::Arguments<'_>) {
    #[cfg(feature = "log")]
    log::trace!(target: "allochook", "[{}] {}", label, line);

    #[cfg(not(feature = "log"))]
    {
        let _ = writeln!(std::io::stderr().lock(), "[{}] {}", label, line);
    }
}
