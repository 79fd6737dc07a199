//! Owner slots: the per-task channel a pool uses to carry a frame from the
//! submitting thread to the worker that runs the task.

use crate::api::error::AllocError;
use crate::api::lifecycle::init;
use crate::core::frame::Frame;

/// Something that can report the frame owning the task it is running.
///
/// Implemented by pool workers and consulted by
/// [`ResolveMode::PoolOwner`](crate::ResolveMode::PoolOwner).
pub trait TaskOwner {
    /// A new reference to the owning frame, or `None` when no task with a
    /// slot is running.
    fn task_owner(&self) -> Option<Frame>;
}

/// A slot holding one reference to the frame minted for a task.
///
/// Claimed on the submitting thread; the reference is released when the
/// slot is dropped, after the task has finished with it.
pub struct OwnerSlot {
    frame: Frame,
}

impl OwnerSlot {
    /// Mint a child of the caller's current frame and keep it in a slot.
    pub fn claim() -> Result<Self, AllocError> {
        Ok(Self { frame: init()? })
    }

    /// Wrap an existing frame.
    pub fn from_frame(frame: Frame) -> Self {
        Self { frame }
    }

    /// A new reference to the slot's frame.
    pub fn get(&self) -> Option<Frame> {
        Some(self.frame.clone())
    }

    /// The slot's frame, without taking a reference.
    pub fn frame(&self) -> &Frame {
        &self.frame
    }
}

impl TaskOwner for OwnerSlot {
    fn task_owner(&self) -> Option<Frame> {
        self.get()
    }
}

impl std::fmt::Debug for OwnerSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnerSlot").field("frame", &self.frame).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::lifecycle::{begin, current_depth, end, ResolveMode};
    use crate::core::frame::FrameState;
    use crate::core::global::start_for_tests;

    #[test]
    fn test_slot_drives_pool_owner_activation() {
        start_for_tests();
        let slot = OwnerSlot::claim().unwrap();
        let observer = slot.frame().clone();
        assert_eq!(observer.ref_count(), 2);

        begin(ResolveMode::PoolOwner(&slot), Some("task")).unwrap();
        assert_eq!(current_depth(), 1);
        end();

        assert_eq!(observer.state(), FrameState::Finished);
        assert_eq!(observer.ref_count(), 2);

        drop(slot);
        assert_eq!(observer.ref_count(), 1);
    }

    #[test]
    fn test_empty_owner_falls_back_to_root() {
        struct Idle;
        impl TaskOwner for Idle {
            fn task_owner(&self) -> Option<Frame> {
                None
            }
        }

        start_for_tests();
        begin(ResolveMode::PoolOwner(&Idle), None).unwrap();
        assert_eq!(current_depth(), 0);
        end();
    }
}
