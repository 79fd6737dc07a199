//! The process-wide root frame.
//!
//! The root is a `static`, so it exists before `startup()` and outlives
//! every other frame. Its count starts at one, owned by the static itself,
//! and it has no free callback: releasing it to zero is fatal.

use crate::core::frame::FrameNode;

pub(crate) static ROOT: FrameNode = FrameNode::root();

/// Live references to the root, the static's own included.
pub(crate) fn root_refs() -> usize {
    ROOT.ref_count()
}
