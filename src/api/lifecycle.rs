//! The frame lifecycle protocol: `init`, `begin`, `end`.
//!
//! The submitting side calls [`init`] to mint a child of its current frame
//! and hands the result to whatever will execute the op. The executing
//! side, possibly on another thread, brackets the op with [`begin`] and
//! [`end`]:
//!
//! ```text
//! caller thread                 executing thread
//! ─────────────                 ────────────────
//! frame = init()  ──hand-off──► begin(mode)   Pending -> Running
//!                               ... op ...    current_depth() == frame.depth()
//!                               end()         Running -> Finished
//! ```
//!
//! The hand-off travels through whichever channel the call site already
//! has: a plain argument ([`ResolveMode::Handoff`]), the worker pool's
//! per-task owner slot ([`ResolveMode::PoolOwner`]), or nothing at all for
//! inline execution ([`ResolveMode::Sync`]).

use crate::api::error::AllocError;
use crate::api::owner::TaskOwner;
use crate::core::frame::{Depth, Frame};
use crate::core::{global, tls};
use crate::diagnostics::{contract_violation, OG101, OG105};

/// Which channel `begin` consults to find the frame to activate.
pub enum ResolveMode<'a> {
    /// No hand-off exists: mint a fresh child of the registered frame.
    Sync,
    /// Re-enter the frame registered on this thread, or the root if none.
    ThreadLocal,
    /// Read the owner slot the pool keeps for the task running on this
    /// thread, or the root if the pool reports none.
    PoolOwner(&'a dyn TaskOwner),
    /// The frame was passed along directly; its reference is consumed.
    Handoff(Frame),
}

impl std::fmt::Debug for ResolveMode<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveMode::Sync => f.write_str("Sync"),
            ResolveMode::ThreadLocal => f.write_str("ThreadLocal"),
            ResolveMode::PoolOwner(_) => f.write_str("PoolOwner"),
            ResolveMode::Handoff(frame) => f.debug_tuple("Handoff").field(frame).finish(),
        }
    }
}

/// Resolve a frame for `mode`. The result carries a reference taken on
/// behalf of the caller.
pub fn resolve(mode: ResolveMode<'_>) -> Result<Frame, AllocError> {
    match mode {
        ResolveMode::Sync => init(),
        ResolveMode::ThreadLocal => Ok(tls::current().unwrap_or_else(Frame::root)),
        ResolveMode::PoolOwner(owner) => Ok(owner.task_owner().unwrap_or_else(Frame::root)),
        ResolveMode::Handoff(frame) => Ok(frame),
    }
}

/// Mint a child of the calling thread's current frame.
///
/// The returned frame is `Pending` and holds the only reference to itself;
/// the caller must hand it to whatever executes the op.
pub fn init() -> Result<Frame, AllocError> {
    global::ensure_started();

    let mother = tls::current().unwrap_or_else(Frame::root);
    let child = Frame::child_of(&mother)?;
    drop(mother);

    debug_assert_eq!(child.ref_count(), 1);
    Ok(child)
}

/// Activate the frame chosen by `mode` on this thread.
///
/// The displaced register occupant is saved and comes back at the matching
/// [`end`]. `label` is recorded on the frame if it has none yet.
///
/// Re-entering the frame already registered on this thread is a nested
/// activation whatever its state, since another thread sharing it may have
/// retired it in the meantime.
pub fn begin(mode: ResolveMode<'_>, label: Option<&'static str>) -> Result<(), AllocError> {
    global::ensure_started();

    let frame = resolve(mode)?;
    if let Some(label) = label {
        frame.set_label(label);
    }

    let first = !tls::holds(&frame) && frame.activate();
    let previous = tls::replace(Some(frame.clone()));
    if first {
        frame.store_saved(previous);
    } else {
        tls::park(&frame, previous);
    }

    global::record_activated(&frame, !first);
    Ok(())
}

/// Retire the frame activated by the matching [`begin`] and restore the
/// frame that was current before it.
///
/// Calling `end` with no active frame on this thread is fatal.
pub fn end() {
    global::ensure_started();
    close_activation(Checks::Enforce);
}

/// Whether [`close_activation`] reports broken contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Checks {
    Enforce,
    /// Used while unwinding, where a second panic would abort.
    Skip,
}

/// Undo the innermost activation on this thread.
pub(crate) fn close_activation(checks: Checks) {
    let Some(frame) = tls::replace(None) else {
        if checks == Checks::Enforce {
            contract_violation(&OG101);
        }
        return;
    };

    let (previous, nested, retired) = match tls::unpark(&frame) {
        Some(previous) => (previous, true, true),
        None => {
            let retired = frame.try_retire();
            (frame.take_saved(), false, retired)
        }
    };

    let displaced = tls::replace(previous);
    debug_assert!(displaced.is_none());

    global::record_retired(&frame, nested);

    if !retired && checks == Checks::Enforce {
        contract_violation(&OG105);
    }
}

/// Depth of the frame executing on this thread (0 outside any op).
pub fn current_depth() -> Depth {
    current_frame().depth()
}

/// The frame executing on this thread, or the root.
pub fn current_frame() -> Frame {
    global::ensure_started();
    tls::current().unwrap_or_else(Frame::root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frame::FrameState;
    use crate::core::global::start_for_tests;

    #[test]
    fn test_init_outside_any_op_is_depth_one() {
        start_for_tests();
        let frame = init().unwrap();
        assert_eq!(frame.depth(), 1);
        assert_eq!(frame.ref_count(), 1);
        assert_eq!(frame.state(), FrameState::Pending);
        assert!(frame.mother().unwrap().is_root());
    }

    #[test]
    fn test_handoff_round_trip() {
        start_for_tests();
        let frame = init().unwrap();
        let observer = frame.clone();

        begin(ResolveMode::Handoff(frame), Some("handoff")).unwrap();
        assert_eq!(observer.state(), FrameState::Running);
        assert_eq!(current_depth(), 1);
        assert!(current_frame().ptr_eq(&observer));
        // Observer plus the register.
        assert_eq!(observer.ref_count(), 2);

        end();
        assert_eq!(observer.state(), FrameState::Finished);
        assert_eq!(observer.ref_count(), 1);
        assert_eq!(observer.label(), Some("handoff"));
        assert!(!tls::is_registered());
    }

    #[test]
    fn test_sync_nesting_restores_register() {
        start_for_tests();
        assert_eq!(current_depth(), 0);

        begin(ResolveMode::Sync, None).unwrap();
        let outer = current_frame();
        assert_eq!(current_depth(), 1);

        begin(ResolveMode::Sync, None).unwrap();
        assert_eq!(current_depth(), 2);
        assert!(current_frame().mother().unwrap().ptr_eq(&outer));

        begin(ResolveMode::Sync, None).unwrap();
        assert_eq!(current_depth(), 3);
        end();

        assert_eq!(current_depth(), 2);
        end();

        assert!(current_frame().ptr_eq(&outer));
        end();

        assert!(!tls::is_registered());
        assert_eq!(outer.state(), FrameState::Finished);
        assert_eq!(outer.ref_count(), 1);
    }

    #[test]
    fn test_chain_of_inits_accumulates_depth() {
        start_for_tests();
        let mut frames = Vec::new();
        for n in 1..=10 {
            let frame = init().unwrap();
            assert_eq!(frame.depth(), n);
            begin(ResolveMode::Handoff(frame.clone()), None).unwrap();
            frames.push(frame);
        }
        for _ in 0..10 {
            end();
        }
        assert_eq!(current_depth(), 0);
        assert!(frames.iter().all(|f| f.state() == FrameState::Finished));
    }

    #[test]
    fn test_thread_local_with_empty_register_activates_root() {
        start_for_tests();
        begin(ResolveMode::ThreadLocal, None).unwrap();
        assert!(current_frame().is_root());
        assert_eq!(tls::parked_len(), 1);

        let child = init().unwrap();
        assert_eq!(child.depth(), 1);

        end();
        assert!(!tls::is_registered());
        assert_eq!(tls::parked_len(), 0);
    }

    #[test]
    fn test_thread_local_reentry_is_refcount_neutral() {
        start_for_tests();
        let frame = init().unwrap();
        begin(ResolveMode::Handoff(frame.clone()), None).unwrap();
        let before = frame.ref_count();

        begin(ResolveMode::ThreadLocal, None).unwrap();
        assert!(current_frame().ptr_eq(&frame));
        end();

        assert_eq!(frame.ref_count(), before);
        assert_eq!(frame.state(), FrameState::Running);
        assert!(current_frame().ptr_eq(&frame));

        end();
        assert_eq!(frame.state(), FrameState::Finished);
        assert_eq!(frame.ref_count(), 1);
    }

    #[test]
    fn test_nested_child_teardown_leaves_mother_count() {
        start_for_tests();
        let a = init().unwrap();
        begin(ResolveMode::Handoff(a.clone()), None).unwrap();
        let before = a.ref_count();

        let b = init().unwrap();
        assert_eq!(b.depth(), 2);
        assert!(b.mother().unwrap().ptr_eq(&a));
        assert_eq!(a.ref_count(), before + 1);

        begin(ResolveMode::Handoff(b), None).unwrap();
        end();
        assert_eq!(a.ref_count(), before);

        end();
    }

    #[test]
    fn test_shared_frame_reentry_after_retirement_elsewhere() {
        use std::sync::{Arc, Barrier};

        start_for_tests();
        let frame = init().unwrap();
        begin(ResolveMode::Handoff(frame.clone()), None).unwrap();

        let shared_running = Arc::new(Barrier::new(2));
        let retired = Arc::new(Barrier::new(2));

        let other = {
            let frame = frame.clone();
            let shared_running = Arc::clone(&shared_running);
            let retired = Arc::clone(&retired);
            std::thread::spawn(move || {
                begin(ResolveMode::Handoff(frame.clone()), None).unwrap();
                shared_running.wait();
                retired.wait();

                assert_eq!(frame.state(), FrameState::Finished);
                begin(ResolveMode::ThreadLocal, None).unwrap();
                assert!(current_frame().ptr_eq(&frame));
                end();
                assert!(current_frame().ptr_eq(&frame));
                end();
                assert!(!tls::is_registered());
            })
        };

        shared_running.wait();
        end();
        retired.wait();
        other.join().unwrap();

        assert_eq!(frame.state(), FrameState::Finished);
        assert_eq!(frame.ref_count(), 1);
    }

    #[test]
    fn test_skipped_checks_tolerate_empty_register() {
        start_for_tests();
        close_activation(Checks::Skip);

        begin(ResolveMode::Sync, None).unwrap();
        let frame = current_frame();
        close_activation(Checks::Skip);
        assert!(!tls::is_registered());
        assert_eq!(frame.state(), FrameState::Finished);
    }

    #[test]
    #[should_panic(expected = "OG101")]
    fn test_end_without_begin_is_fatal() {
        crate::diagnostics::suppress_diagnostics(true);
        start_for_tests();
        end();
    }

    #[test]
    #[should_panic(expected = "OG102")]
    fn test_reactivating_finished_frame_is_fatal() {
        crate::diagnostics::suppress_diagnostics(true);
        start_for_tests();
        let frame = init().unwrap();
        begin(ResolveMode::Handoff(frame.clone()), None).unwrap();
        end();
        let _ = begin(ResolveMode::Handoff(frame), None);
    }
}
