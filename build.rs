//! Build script for allochook.
//!
//! Emits build-time notes about feature combinations and targets.

use std::env;

fn main() {
    // Re-run if features change
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_DEBUG");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_DIAGNOSTICS");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_LOG");

    let debug_enabled = env::var("CARGO_FEATURE_DEBUG").is_ok();
    let diagnostics_enabled = env::var("CARGO_FEATURE_DIAGNOSTICS").is_ok();
    let log_enabled = env::var("CARGO_FEATURE_LOG").is_ok();

    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());
    let is_release = profile == "release";

    // --- Debug Features ---
    if debug_enabled && is_release {
        emit_warning("Debug features enabled in release build!");
        emit_note("LeakTracker captures a backtrace per allocation and allocates on every event.");
    }

    // --- Diagnostics output ---
    if is_release && !diagnostics_enabled && !log_enabled {
        emit_note("Contract diagnostics are silent in release builds.");
        emit_note("  allochook = { version = \"0.1\", features = [\"diagnostics\"] }");
    }

    check_target();
}

// =============================================================================
// Diagnostic emission helpers
// =============================================================================

fn emit_note(msg: &str) {
    println!("cargo:warning=[allochook]    {}", msg);
}

fn emit_warning(msg: &str) {
    println!("cargo:warning=[allochook] {}", msg);
}

// =============================================================================
// Environment checks
// =============================================================================

fn check_target() {
    let os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let has_system_allocator = matches!(
        os.as_str(),
        "linux" | "android" | "freebsd" | "macos" | "ios"
    );

    if !has_system_allocator {
        emit_warning(&format!("SystemAllocator is not available on target os '{}'", os));
        emit_note("End chains with your own RawAllocator implementation instead.");
    }
}
