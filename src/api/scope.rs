//! RAII activation guards.

use std::marker::PhantomData;

use crate::api::error::AllocError;
use crate::api::lifecycle::{begin, close_activation, end, Checks, ResolveMode};
use crate::core::frame::{Depth, Frame};
use crate::core::tls;

/// An open `begin`/`end` bracket on the current thread.
///
/// Dropping the guard calls [`end`], so the bracket also closes when the
/// op unwinds. While unwinding the contract checks are skipped and the
/// op's own panic is the one that propagates.
///
/// Guards must be dropped in reverse order of creation and on the thread
/// that created them, hence `!Send`.
///
/// # Example
///
/// ```rust,no_run
/// use opgraph::{Activation, GraphConfig, ResolveMode};
///
/// opgraph::startup(GraphConfig::default()).unwrap();
/// {
///     let _op = Activation::enter(ResolveMode::Sync, Some("parse")).unwrap();
///     assert_eq!(opgraph::current_depth(), 1);
/// }
/// assert_eq!(opgraph::current_depth(), 0);
/// ```
pub struct Activation {
    _not_send: PhantomData<*const ()>,
}

impl Activation {
    /// Run [`begin`] and return the guard that will run [`end`].
    pub fn enter(mode: ResolveMode<'_>, label: Option<&'static str>) -> Result<Self, AllocError> {
        begin(mode, label)?;
        Ok(Self {
            _not_send: PhantomData,
        })
    }

    /// The frame this activation installed.
    pub fn frame(&self) -> Frame {
        tls::current().unwrap_or_else(Frame::root)
    }

    /// Depth of the frame this activation installed.
    pub fn depth(&self) -> Depth {
        self.frame().depth()
    }
}

impl Drop for Activation {
    fn drop(&mut self) {
        if std::thread::panicking() {
            close_activation(Checks::Skip);
        } else {
            end();
        }
    }
}

/// Run `f` as a synchronous op: a child of the current frame, activated
/// on this thread for the duration of the call.
pub fn run_sync<R>(label: &'static str, f: impl FnOnce() -> R) -> Result<R, AllocError> {
    let _op = Activation::enter(ResolveMode::Sync, Some(label))?;
    Ok(f())
}

/// Run `f` under a frame handed over from elsewhere, usually one minted by
/// [`init`](crate::init) on another thread.
pub fn run_handoff<R>(
    frame: Frame,
    label: &'static str,
    f: impl FnOnce() -> R,
) -> Result<R, AllocError> {
    let _op = Activation::enter(ResolveMode::Handoff(frame), Some(label))?;
    Ok(f())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::lifecycle::{current_depth, current_frame, init};
    use crate::core::frame::FrameState;
    use crate::core::global::start_for_tests;

    #[test]
    fn test_run_sync_nests() {
        start_for_tests();
        let depths = run_sync("outer", || {
            let outer = current_depth();
            let inner = run_sync("inner", current_depth).unwrap();
            (outer, inner)
        })
        .unwrap();
        assert_eq!(depths, (1, 2));
        assert_eq!(current_depth(), 0);
    }

    #[test]
    fn test_run_handoff_across_threads() {
        start_for_tests();
        let frame = run_sync("submitter", || init().unwrap()).unwrap();
        let observer = frame.clone();
        assert_eq!(frame.depth(), 2);

        let depth = std::thread::spawn(move || run_handoff(frame, "worker", current_depth))
            .join()
            .unwrap()
            .unwrap();

        assert_eq!(depth, 2);
        assert_eq!(observer.state(), FrameState::Finished);
        assert_eq!(observer.ref_count(), 1);
    }

    #[test]
    fn test_guard_ends_on_unwind() {
        start_for_tests();
        let result = std::panic::catch_unwind(|| {
            run_sync("doomed", || {
                assert_eq!(current_depth(), 1);
                panic!("op failed");
            })
        });
        assert!(result.is_err());
        assert_eq!(current_depth(), 0);
        assert!(current_frame().is_root());
    }

    #[test]
    fn test_activation_reports_frame() {
        start_for_tests();
        let op = Activation::enter(ResolveMode::Sync, Some("guarded")).unwrap();
        assert_eq!(op.depth(), 1);
        assert_eq!(op.frame().label(), Some("guarded"));
        drop(op);
        assert!(!tls::is_registered());
    }
}
