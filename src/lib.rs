//! # opgraph
//!
//! Call-graph lineage for operations that run inline, on a worker pool, or
//! on whatever thread happens to pick them up.
//!
//! Every op gets a *frame* linking it to the op that submitted it. Frames
//! form a tree under a single static root, are reference counted without
//! locks, and stay alive exactly as long as some descendant or holder
//! needs them.
//!
//! ## Features
//!
//! - `init` / `begin` / `end` lifecycle protocol with explicit resolution modes
//! - Thread-local current-frame register with save/restore on nesting
//! - Per-task owner slots for worker pools
//! - Iterative teardown of arbitrarily deep chains
//! - Frame lifecycle events and coded diagnostics
//! - Live-frame limit and statistics
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use opgraph::{GraphConfig, ResolveMode};
//!
//! opgraph::startup(GraphConfig::default()).unwrap();
//!
//! // Caller side
//! let frame = opgraph::init().unwrap();
//!
//! // Callee side, possibly on another thread
//! opgraph::begin(ResolveMode::Handoff(frame), Some("load")).unwrap();
//! assert_eq!(opgraph::current_depth(), 1);
//! opgraph::end();
//! ```

pub mod api;
pub mod diagnostics;
pub mod pool;

mod core;
mod sync;

// Re-export public API at crate root for convenience
pub use api::config::{GraphConfig, PoolConfig, ENV_EVENTS, ENV_FRAME_LIMIT};
pub use api::error::{AllocError, InitError};
pub use api::lifecycle::{begin, current_depth, current_frame, end, init, resolve, ResolveMode};
pub use api::owner::{OwnerSlot, TaskOwner};
pub use api::scope::{run_handoff, run_sync, Activation};
pub use api::stats::GraphStats;

// Frames
pub use crate::core::frame::{Ancestors, Depth, Frame, FrameId, FrameState};

// Bootstrap
pub use crate::core::global::{is_started, shutdown, startup, startup_from_env, stats};

// Worker pool
pub use pool::{TaskHandle, WorkerPool};

// Diagnostics - events and predefined codes
pub use diagnostics::{on_frame_event, remove_frame_listener, FrameEvent, ListenerId};
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use diagnostics::{OG001, OG002, OG101, OG102, OG103, OG104, OG105, OG201, OG901};
