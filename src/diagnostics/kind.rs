//! Diagnostic kinds and the predefined `OGxxx` table.

/// The severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// The call graph is corrupt; emission is followed by a panic.
    Error,
    /// A recoverable condition surfaced to the caller as an `Err`.
    Warning,
}

impl DiagnosticKind {
    /// Get the display prefix for this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            DiagnosticKind::Error => "error",
            DiagnosticKind::Warning => "warning",
        }
    }
}

/// A diagnostic message with code, message, and optional context.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Severity level.
    pub kind: DiagnosticKind,
    /// Diagnostic code (e.g., "OG101").
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

    pub const fn with_note(mut self, note: &'static str) -> Self {
        self.note = Some(note);
        self
    }

    pub const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[opgraph][{}] {}: {}", self.code, self.kind.prefix(), self.message)
    }
}

// =============================================================================
// OG0xx - Frame allocation
// =============================================================================

/// OG001: The system allocator returned null for a frame.
pub const OG001: Diagnostic = Diagnostic::warning(
    "OG001",
    "frame allocation failed"
).with_note("the system allocator could not provide memory for a new frame")
 .with_help("the op should be rejected by its submitter; no frame was created");

/// OG002: The configured frame limit is exhausted.
pub const OG002: Diagnostic = Diagnostic::warning(
    "OG002",
    "live frame limit reached, allocation refused"
).with_note("every in-flight op holds at least one frame")
 .with_help("raise GraphConfig::frame_limit or check for ops that never call end()");

// =============================================================================
// OG1xx - Lifecycle contract violations
// =============================================================================

/// OG101: `end()` without a matching `begin()`.
pub const OG101: Diagnostic = Diagnostic::error(
    "OG101",
    "end() called with no active frame on this thread"
).with_note("every end() must be paired with a begin() on the same thread")
 .with_help("use Activation or run_sync() to pair the calls automatically");

/// OG102: `begin()` on a retired frame.
pub const OG102: Diagnostic = Diagnostic::error(
    "OG102",
    "begin() on a frame that has already finished"
).with_note("a frame is activated once and retired once")
 .with_help("mint a fresh frame with init() for every op");

/// OG103: Reference count released below zero.
pub const OG103: Diagnostic = Diagnostic::error(
    "OG103",
    "frame reference count released below zero"
).with_note("a frame reference was released more times than it was taken");

/// OG104: The root frame lost its static reference.
pub const OG104: Diagnostic = Diagnostic::error(
    "OG104",
    "root frame reference count reached zero"
).with_note("the root frame is static and must never be freed");

/// OG105: Retiring a frame that is not running.
pub const OG105: Diagnostic = Diagnostic::error(
    "OG105",
    "end() on a frame that is not running"
).with_note("the frame in the register was never activated or was retired twice");

// =============================================================================
// OG2xx - Bootstrap
// =============================================================================

/// OG201: Entry point used before `startup()`.
pub const OG201: Diagnostic = Diagnostic::error(
    "OG201",
    "call graph used before startup()"
).with_help("call opgraph::startup() once before submitting any op");

// =============================================================================
// OG9xx - Internal
// =============================================================================

/// OG901: Internal bookkeeping error.
pub const OG901: Diagnostic = Diagnostic::error(
    "OG901",
    "internal call graph error"
).with_note("this indicates a bug in opgraph");
