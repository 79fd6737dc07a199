//! Synchronization primitives.
//!
//! The frame graph itself is lock-free: every frame carries a [`RefCount`]
//! and the only locks live in the listener registry.

pub(crate) mod atomics;
pub(crate) mod mutex;
pub(crate) mod refcount;

pub(crate) use refcount::RefCount;
