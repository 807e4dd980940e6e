//! Coded diagnostics and per-call tracing.
//!
//! This module provides:
//! - **Runtime diagnostics**: contract messages with codes, rustc style
//! - **Strict mode**: optional panic-on-diagnostic for `emit` callers;
//!   interceptors report without consulting it
//! - **Tracing**: one line per intercepted call when a link enables it
//!
//! ## Diagnostic Codes
//!
//! | Code  | Meaning                                      |
//! |-------|----------------------------------------------|
//! | AH001 | alignment changed on a malloc/realloc path   |
//! | AH002 | pre-alloc shrank a request                   |
//! | AH003 | memalign alignment the allocator will reject |
//! | AH9xx | Internal errors                              |

pub mod emit;
pub mod kind;
pub(crate) mod macros;
pub mod strict;

pub use emit::{emit, emit_with_context, is_suppressed, report_with_context, suppress_diagnostics};
pub use kind::{Diagnostic, DiagnosticKind};
pub use kind::{AH001, AH002, AH003, AH901};
pub use strict::{init_from_env, set_strict_mode, strict_mode, StrictMode, StrictModeGuard};
