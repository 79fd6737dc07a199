//! Global shared state.
//!
//! One process-wide instance, const-initialized, holding the bootstrap
//! flag, the active configuration and the statistics counters.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::thread;

use crate::api::config::GraphConfig;
use crate::api::error::{AllocError, InitError};
use crate::api::stats::GraphStats;
use crate::core::frame::{Depth, Frame, FrameId};
use crate::core::root;
use crate::diagnostics::hooks::{dispatch, has_listeners};
use crate::diagnostics::{contract_violation, FrameEvent, OG201};
use crate::sync::atomics::{AtomicCounter, AtomicGauge};

const DOWN: u8 = 0;
const STARTING: u8 = 1;
const UP: u8 = 2;

/// Global state shared across all threads.
struct GlobalState {
    phase: AtomicU8,

    /// Configuration
    frame_limit: AtomicUsize,
    events: AtomicBool,

    /// Live non-root frames
    live: AtomicGauge,
    peak: AtomicGauge,
    created: AtomicCounter,
    destroyed: AtomicCounter,
    activations: AtomicCounter,
}

impl GlobalState {
    const fn new() -> Self {
        Self {
            phase: AtomicU8::new(DOWN),
            frame_limit: AtomicUsize::new(0),
            events: AtomicBool::new(true),
            live: AtomicGauge::new(0),
            peak: AtomicGauge::new(0),
            created: AtomicCounter::new(0),
            destroyed: AtomicCounter::new(0),
            activations: AtomicCounter::new(0),
        }
    }

    fn events_wanted(&self) -> bool {
        self.events.load(Ordering::Relaxed) && has_listeners()
    }
}

static STATE: GlobalState = GlobalState::new();

/// Bring the call graph up. Must succeed before any other entry point.
///
/// Fails with [`InitError::AlreadyStarted`] if called twice without an
/// intervening [`shutdown`].
pub fn startup(config: GraphConfig) -> Result<(), InitError> {
    STATE
        .phase
        .compare_exchange(DOWN, STARTING, Ordering::AcqRel, Ordering::Acquire)
        .map_err(|_| InitError::AlreadyStarted)?;

    STATE.frame_limit.store(config.frame_limit, Ordering::Relaxed);
    STATE.events.store(config.events, Ordering::Relaxed);
    STATE.phase.store(UP, Ordering::Release);

    #[cfg(feature = "log")]
    log::debug!(
        "opgraph started (frame_limit={}, events={})",
        config.frame_limit,
        config.events
    );
    Ok(())
}

/// [`startup`] with a configuration read from the environment.
pub fn startup_from_env() -> Result<(), InitError> {
    startup(GraphConfig::from_env()?)
}

/// Take the call graph down and return the final statistics.
///
/// Frames still alive stay valid and are released normally; only the entry
/// points refuse to run until the next [`startup`].
pub fn shutdown() -> GraphStats {
    STATE.phase.store(DOWN, Ordering::Release);
    let stats = stats();

    #[cfg(feature = "log")]
    log::debug!("opgraph shut down with {} live frames", stats.live_frames);
    stats
}

/// Whether [`startup`] has completed.
pub fn is_started() -> bool {
    STATE.phase.load(Ordering::Acquire) == UP
}

pub(crate) fn ensure_started() {
    if !is_started() {
        contract_violation(&OG201);
    }
}

/// Current statistics.
pub fn stats() -> GraphStats {
    GraphStats {
        live_frames: STATE.live.get(),
        peak_live_frames: STATE.peak.get(),
        frames_created: STATE.created.get(),
        frames_destroyed: STATE.destroyed.get(),
        activations: STATE.activations.get(),
        root_refs: root::root_refs(),
    }
}

/// Claim room for one more frame under the configured limit.
pub(crate) fn reserve_frame() -> Result<(), AllocError> {
    let limit = STATE.frame_limit.load(Ordering::Relaxed);
    match STATE.live.try_increment(limit) {
        Ok(live) => {
            STATE.peak.update_max(live);
            Ok(())
        }
        Err(live) => Err(AllocError::LimitReached { live, limit }),
    }
}

/// Undo a [`reserve_frame`] whose allocation failed.
pub(crate) fn cancel_reservation() {
    STATE.live.decrement();
}

pub(crate) fn record_created(frame: &Frame) {
    STATE.created.increment();
    if STATE.events_wanted() {
        dispatch(&FrameEvent::Created {
            id: frame.id(),
            mother: frame.mother().map_or(FrameId::ROOT, |m| m.id()),
            depth: frame.depth(),
        });
    }
}

pub(crate) fn record_destroyed(id: FrameId, depth: Depth) {
    STATE.destroyed.increment();
    let remaining = STATE.live.decrement();

    #[cfg(feature = "log")]
    log::trace!("frame {} cleared, {} remaining", id, remaining);

    if STATE.events_wanted() {
        dispatch(&FrameEvent::Destroyed {
            id,
            depth,
            remaining,
        });
    }
}

pub(crate) fn record_activated(frame: &Frame, nested: bool) {
    STATE.activations.increment();
    if STATE.events_wanted() {
        dispatch(&FrameEvent::Activated {
            id: frame.id(),
            depth: frame.depth(),
            label: frame.label(),
            thread_id: thread::current().id(),
            nested,
        });
    }
}

pub(crate) fn record_retired(frame: &Frame, nested: bool) {
    if STATE.events_wanted() {
        dispatch(&FrameEvent::Retired {
            id: frame.id(),
            thread_id: thread::current().id(),
            nested,
        });
    }
}

/// Start with defaults unless a test already did.
#[cfg(test)]
pub(crate) fn start_for_tests() {
    let _ = startup(GraphConfig::default());
}
