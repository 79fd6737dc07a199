//! Diagnostics and observability hooks.
//!
//! This module provides:
//! - **Coded diagnostics**: rustc-style messages for allocation failures and
//!   contract violations
//! - **Frame events**: listeners notified as frames are created, activated,
//!   retired and destroyed
//!
//! ## Diagnostic Codes
//!
//! | Code  | Meaning                        |
//! |-------|--------------------------------|
//! | OG0xx | Frame allocation issues        |
//! | OG1xx | Lifecycle contract violations  |
//! | OG2xx | Bootstrap issues               |
//! | OG9xx | Internal errors                |
//!
//! Contract violations are fatal: [`contract_violation`] emits the
//! diagnostic and panics, because the call graph can no longer be trusted.

pub mod emit;
pub mod hooks;
pub mod kind;

pub use emit::{contract_violation, emit, is_suppressed, suppress_diagnostics};
pub use hooks::{on_frame_event, remove_frame_listener, FrameEvent, ListenerId};
pub use kind::{Diagnostic, DiagnosticKind};

pub use kind::{OG001, OG002, OG101, OG102, OG103, OG104, OG105, OG201, OG901};
