//! Thread-local current-frame register.
//!
//! Each thread has one register slot holding a counted reference to the
//! frame it is executing, plus a side stack for activations whose frame is
//! shared (the root, or a frame re-entered on the same thread) and so
//! cannot keep the displaced occupant in its own `saved_previous`.

use std::cell::RefCell;

use crate::core::frame::{Frame, FrameNode};

/// An occupant displaced by a shared activation.
struct Parked {
    owner: *const FrameNode,
    previous: Option<Frame>,
}

thread_local! {
    static REGISTER: RefCell<Option<Frame>> = const { RefCell::new(None) };
    static PARKED: RefCell<Vec<Parked>> = const { RefCell::new(Vec::new()) };
}

/// A new reference to the registered frame, if any.
///
/// Returns `None` while the thread's locals are being destroyed.
pub(crate) fn current() -> Option<Frame> {
    REGISTER
        .try_with(|slot| slot.borrow().clone())
        .ok()
        .flatten()
}

/// Whether `frame` is the registered frame.
pub(crate) fn holds(frame: &Frame) -> bool {
    REGISTER
        .try_with(|slot| {
            slot.borrow()
                .as_ref()
                .map_or(false, |current| current.ptr_eq(frame))
        })
        .unwrap_or(false)
}

/// Install `frame`, handing back ownership of the previous occupant.
///
/// The returned reference is dropped by the caller, outside the borrow.
pub(crate) fn replace(frame: Option<Frame>) -> Option<Frame> {
    REGISTER.with(|slot| slot.replace(frame))
}

/// Remember `previous` for a shared activation of `owner`.
pub(crate) fn park(owner: &Frame, previous: Option<Frame>) {
    PARKED.with(|stack| {
        stack.borrow_mut().push(Parked {
            owner: owner.as_ptr(),
            previous,
        })
    });
}

/// Pop the parked occupant if the innermost shared activation is `owner`.
///
/// The outer `Option` is `None` when `owner`'s activation was not parked.
pub(crate) fn unpark(owner: &Frame) -> Option<Option<Frame>> {
    PARKED.with(|stack| {
        let mut stack = stack.borrow_mut();
        match stack.last() {
            Some(top) if std::ptr::eq(top.owner, owner.as_ptr()) => {
                stack.pop().map(|parked| parked.previous)
            }
            _ => None,
        }
    })
}

/// Whether this thread has a frame registered.
#[cfg(test)]
pub(crate) fn is_registered() -> bool {
    REGISTER
        .try_with(|slot| slot.borrow().is_some())
        .unwrap_or(false)
}

/// Number of shared activations open on this thread.
#[cfg(test)]
pub(crate) fn parked_len() -> usize {
    PARKED.with(|stack| stack.borrow().len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_transfers_ownership() {
        let root = Frame::root();
        let child = Frame::child_of(&root).unwrap();

        assert!(!holds(&child));
        assert!(replace(Some(child.clone())).is_none());
        assert_eq!(child.ref_count(), 2);
        assert!(is_registered());
        assert!(holds(&child));
        assert!(!holds(&root));

        let seen = current().unwrap();
        assert!(seen.ptr_eq(&child));
        assert_eq!(child.ref_count(), 3);
        drop(seen);

        let back = replace(None).unwrap();
        assert!(back.ptr_eq(&child));
        drop(back);
        assert_eq!(child.ref_count(), 1);
        assert!(!is_registered());
    }

    #[test]
    fn test_unpark_matches_innermost_owner_only() {
        let root = Frame::root();
        let a = Frame::child_of(&root).unwrap();

        park(&root, None);
        park(&a, Some(root.clone()));
        assert_eq!(parked_len(), 2);

        assert!(unpark(&root).is_none());
        let previous = unpark(&a).unwrap();
        assert!(previous.unwrap().is_root());
        assert_eq!(unpark(&root).unwrap(), None);
        assert_eq!(parked_len(), 0);
    }

    #[test]
    fn test_register_released_on_thread_exit() {
        let root = Frame::root();
        let child = Frame::child_of(&root).unwrap();

        let installed = child.clone();
        std::thread::spawn(move || {
            replace(Some(installed));
        })
        .join()
        .unwrap();

        assert_eq!(child.ref_count(), 1);
    }
}
