//! Diagnostic emission backend.
//!
//! Writes to stderr in debug builds (or with the `diagnostics` feature) and
//! forwards to the `log` crate when the `log` feature is enabled.

#[cfg(any(debug_assertions, feature = "diagnostics"))]
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use super::kind::{Diagnostic, DiagnosticKind};

/// Global flag to suppress stderr output (for testing).
static DIAGNOSTICS_SUPPRESSED: AtomicBool = AtomicBool::new(false);

/// Suppress diagnostic output on stderr. Log records are still produced.
pub fn suppress_diagnostics(suppress: bool) {
    DIAGNOSTICS_SUPPRESSED.store(suppress, Ordering::Relaxed);
}

/// Check if diagnostics are suppressed.
pub fn is_suppressed() -> bool {
    DIAGNOSTICS_SUPPRESSED.load(Ordering::Relaxed)
}

/// Emit a diagnostic.
pub fn emit(diag: &Diagnostic) {
    #[cfg(feature = "log")]
    emit_to_log(diag);

    if is_suppressed() {
        return;
    }

    #[cfg(any(debug_assertions, feature = "diagnostics"))]
    emit_to_stderr(diag);
}

/// Report a broken lifecycle contract and panic.
///
/// Continuing after one of these would operate on a corrupted call graph.
#[cold]
#[track_caller]
pub fn contract_violation(diag: &Diagnostic) -> ! {
    emit(diag);
    panic!("{}", diag);
}

#[cfg(any(debug_assertions, feature = "diagnostics"))]
fn emit_to_stderr(diag: &Diagnostic) {
    let mut stderr = std::io::stderr().lock();

    let _ = writeln!(stderr, "{}", diag);
    if let Some(note) = diag.note {
        let _ = writeln!(stderr, "  note: {}", note);
    }
    if let Some(help) = diag.help {
        let _ = writeln!(stderr, "  help: {}", help);
    }
    if diag.kind == DiagnosticKind::Error {
        let _ = writeln!(
            stderr,
            "  thread: {}",
            std::thread::current().name().unwrap_or("<unnamed>")
        );
    }
    let _ = writeln!(stderr);
}

#[cfg(feature = "log")]
fn emit_to_log(diag: &Diagnostic) {
    match diag.kind {
        DiagnosticKind::Error => log::error!("[{}] {}", diag.code, diag.message),
        DiagnosticKind::Warning => log::warn!("[{}] {}", diag.code, diag.message),
    }
    if let Some(note) = diag.note {
        log::debug!("  note: {}", note);
    }
}
