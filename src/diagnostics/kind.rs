//! Diagnostic kinds and core types.
//!
//! Mirrors rustc's diagnostic levels for familiar UX.

/// The severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A hard error - an interception contract was broken.
    Error,
    /// A warning - the request is legal but probably not what the sink meant.
    Warning,
    /// Additional context about another diagnostic.
    Note,
    /// Actionable suggestion to fix the issue.
    Help,
}

impl DiagnosticKind {
    /// Get the display prefix for this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            DiagnosticKind::Error => "error",
            DiagnosticKind::Warning => "warning",
            DiagnosticKind::Note => "note",
            DiagnosticKind::Help => "help",
        }
    }
}

/// A diagnostic message with code, message, and optional context.
///
/// Diagnostic codes follow the pattern:
/// - `AH0xx` - Event sink contract issues
/// - `AH9xx` - Internal errors
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Severity level.
    pub kind: DiagnosticKind,
    /// Diagnostic code (e.g., "AH001").
    pub code: &'static str,
    /// Primary message.
    pub message: &'static str,
    /// Optional additional context.
    pub note: Option<&'static str>,
    /// Optional fix suggestion.
    pub help: Option<&'static str>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub const fn error(code: &'static str, message: &'static str) -> Self {
        Self {
            kind: DiagnosticKind::Error,
            code,
            message,
            note: None,
            help: None,
        }
    }

    /// Create a new warning diagnostic.
    pub const fn warning(code: &'static str, message: &'static str) -> Self {
        Self {
            kind: DiagnosticKind::Warning,
            code,
            message,
            note: None,
            help: None,
        }
    }

    /// Add a note to this diagnostic.
    pub const fn with_note(mut self, note: &'static str) -> Self {
        self.note = Some(note);
        self
    }

    /// Add a help message to this diagnostic.
    pub const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

// =============================================================================
// Predefined diagnostics (AH0xx - Event sink contract)
// =============================================================================

/// AH001: pre-alloc changed the alignment of a pointer-aligned request.
pub const AH001: Diagnostic = Diagnostic::error(
    "AH001",
    "pre_alloc changed the alignment of a malloc/realloc request"
).with_note("malloc and realloc carry no alignment argument, so the next allocator can only honour pointer alignment")
 .with_help("only adjust `align` for memalign requests; grow `size` instead to make room for metadata");

/// AH002: pre-alloc shrank a request.
pub const AH002: Diagnostic = Diagnostic::warning(
    "AH002",
    "pre_alloc returned a size smaller than the caller requested"
).with_note("the caller will write past the end of the block it receives")
 .with_help("event sinks may grow a request but should never shrink it");

/// AH003: pre-alloc gave a memalign request an alignment the allocator rejects.
pub const AH003: Diagnostic = Diagnostic::warning(
    "AH003",
    "pre_alloc produced a memalign alignment that is not a power of two"
).with_note("the next allocator is likely to fail this request")
 .with_help("round the adjusted alignment up to the next power of two");

// =============================================================================
// Predefined diagnostics (AH9xx - Internal)
// =============================================================================

/// AH901: Internal interceptor error.
pub const AH901: Diagnostic = Diagnostic::error(
    "AH901",
    "internal interceptor error"
).with_note("this indicates a bug in allochook")
 .with_help("please report this issue at the allochook repository");
