//! Frame nodes and the counted `Frame` handle.
//!
//! A frame is heap-allocated with the system allocator, carries an
//! intrusive [`RefCount`], and holds one counted reference to its mother.
//! Mothers never point at their children, so the graph is a tree whose
//! edges all point rootward.

use std::alloc::{alloc, dealloc, Layout};
use std::marker::PhantomData;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicPtr, AtomicU64, AtomicU8, Ordering};
use std::sync::OnceLock;

use crate::api::error::AllocError;
use crate::core::global;
use crate::core::root::ROOT;
use crate::diagnostics::{contract_violation, emit, OG001, OG002, OG102, OG104, OG901};
use crate::sync::RefCount;

/// Distance from the root along mother links.
pub type Depth = u32;

/// Process-unique frame identifier. The root is always `FrameId::ROOT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameId(u64);

impl FrameId {
    /// Identifier of the root frame.
    pub const ROOT: FrameId = FrameId(0);

    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw identifier value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for FrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameState {
    /// Minted by `init`, not yet activated.
    Pending = 0,
    /// Activated by `begin`.
    Running = 1,
    /// Retired by `end`.
    Finished = 2,
}

impl From<u8> for FrameState {
    fn from(val: u8) -> Self {
        match val {
            0 => FrameState::Pending,
            1 => FrameState::Running,
            _ => FrameState::Finished,
        }
    }
}

/// Teardown hook run once the count reaches zero.
///
/// Returns the mother whose reference the destroyed frame was holding, so
/// [`release`] can continue up the chain without recursing.
pub(crate) type FreeFn = unsafe fn(NonNull<FrameNode>) -> Option<NonNull<FrameNode>>;

/// The shared node behind every [`Frame`] handle.
pub(crate) struct FrameNode {
    refcount: RefCount,
    free: Option<FreeFn>,
    id: FrameId,
    /// Owns one counted reference. `None` only for the root.
    mother: Option<NonNull<FrameNode>>,
    depth: Depth,
    state: AtomicU8,
    /// Register occupant displaced by this frame's first activation.
    /// Owns one counted reference while non-null.
    saved_previous: AtomicPtr<FrameNode>,
    label: OnceLock<&'static str>,
}

// SAFETY: `mother`, `depth`, `id` and `free` are immutable after
// construction; every other field is atomic.
unsafe impl Send for FrameNode {}
unsafe impl Sync for FrameNode {}

impl FrameNode {
    /// The root node: no mother, depth 0, no free callback, and a count of
    /// one owned by the static itself.
    pub(crate) const fn root() -> Self {
        Self {
            refcount: RefCount::new(1),
            free: None,
            id: FrameId::ROOT,
            mother: None,
            depth: 0,
            state: AtomicU8::new(FrameState::Running as u8),
            saved_previous: AtomicPtr::new(ptr::null_mut()),
            label: OnceLock::new(),
        }
    }

    pub(crate) fn ref_count(&self) -> usize {
        self.refcount.get()
    }
}

/// Allocate a child node of `mother`, taking over the caller's reference
/// to it.
///
/// Fails without side effects when the frame limit is reached or the
/// system allocator is exhausted; `mother` is released in that case.
pub(crate) fn allocate_frame(mother: Frame) -> Result<Frame, AllocError> {
    if let Err(err) = global::reserve_frame() {
        emit(&OG002);
        return Err(err);
    }

    let layout = Layout::new::<FrameNode>();
    // SAFETY: FrameNode is not zero-sized.
    let raw = unsafe { alloc(layout) }.cast::<FrameNode>();
    let Some(ptr) = NonNull::new(raw) else {
        global::cancel_reservation();
        emit(&OG001);
        return Err(AllocError::OutOfMemory {
            size: layout.size(),
        });
    };

    let node = FrameNode {
        refcount: RefCount::new(1),
        free: Some(free_frame),
        id: FrameId::next(),
        depth: mother.depth() + 1,
        mother: Some(mother.into_raw()),
        state: AtomicU8::new(FrameState::Pending as u8),
        saved_previous: AtomicPtr::new(ptr::null_mut()),
        label: OnceLock::new(),
    };
    // SAFETY: `ptr` is a fresh allocation with FrameNode's layout.
    unsafe { ptr.as_ptr().write(node) };

    Ok(Frame::from_node(ptr))
}

/// Free callback of every heap frame.
///
/// # Safety
/// `ptr` must come from [`allocate_frame`] and its count must be zero.
unsafe fn free_frame(ptr: NonNull<FrameNode>) -> Option<NonNull<FrameNode>> {
    let node = ptr.as_ptr().read();
    dealloc(ptr.as_ptr().cast(), Layout::new::<FrameNode>());

    // Only set while the frame sits in a register, which holds its own
    // reference; a thread exiting mid-activation can still leave one here.
    if let Some(saved) = NonNull::new(node.saved_previous.swap(ptr::null_mut(), Ordering::Acquire)) {
        release(saved);
    }

    global::record_destroyed(node.id, node.depth);
    node.mother
}

/// Drop one reference, tearing down every ancestor that reaches zero.
pub(crate) fn release(ptr: NonNull<FrameNode>) {
    let mut next = Some(ptr);
    while let Some(current) = next {
        // SAFETY: the caller owned one reference, so the node is alive.
        let node = unsafe { current.as_ref() };
        let free = node.free;
        if !node.refcount.decrement() {
            return;
        }
        next = match free {
            // SAFETY: we released the last reference.
            Some(free) => unsafe { free(current) },
            None => contract_violation(&OG104),
        };
    }
}

/// A counted reference to a frame.
///
/// Cloning takes a reference, dropping releases it. When the last
/// reference goes the frame is freed and its hold on the mother released.
pub struct Frame {
    node: NonNull<FrameNode>,
    _marker: PhantomData<FrameNode>,
}

// SAFETY: FrameNode is Send + Sync and the count is atomic.
unsafe impl Send for Frame {}
unsafe impl Sync for Frame {}

impl Frame {
    fn from_node(node: NonNull<FrameNode>) -> Self {
        Self {
            node,
            _marker: PhantomData,
        }
    }

    /// A new reference to the root frame.
    pub fn root() -> Self {
        ROOT.refcount.increment();
        Self::from_node(NonNull::from(&ROOT))
    }

    /// Mint a child of `mother` in the `Pending` state.
    pub(crate) fn child_of(mother: &Frame) -> Result<Frame, AllocError> {
        let child = allocate_frame(mother.clone())?;
        global::record_created(&child);
        Ok(child)
    }

    /// Give up the handle without releasing its reference.
    pub(crate) fn into_raw(self) -> NonNull<FrameNode> {
        let node = self.node;
        std::mem::forget(self);
        node
    }

    /// Re-adopt a reference produced by [`Frame::into_raw`].
    ///
    /// # Safety
    /// `node` must carry one counted reference that nobody else will release.
    pub(crate) unsafe fn from_raw(node: NonNull<FrameNode>) -> Self {
        Self::from_node(node)
    }

    pub(crate) fn node(&self) -> &FrameNode {
        // SAFETY: this handle keeps the node alive.
        unsafe { self.node.as_ref() }
    }

    pub(crate) fn as_ptr(&self) -> *const FrameNode {
        self.node.as_ptr()
    }

    /// Process-unique identifier.
    pub fn id(&self) -> FrameId {
        self.node().id
    }

    /// Distance from the root.
    pub fn depth(&self) -> Depth {
        self.node().depth
    }

    /// Current lifecycle state.
    pub fn state(&self) -> FrameState {
        FrameState::from(self.node().state.load(Ordering::Acquire))
    }

    /// Number of live references, this handle included.
    pub fn ref_count(&self) -> usize {
        self.node().ref_count()
    }

    /// Whether this is the process-wide root frame.
    pub fn is_root(&self) -> bool {
        ptr::eq(self.as_ptr(), &ROOT)
    }

    /// Label recorded by the first labelled `begin`.
    pub fn label(&self) -> Option<&'static str> {
        self.node().label.get().copied()
    }

    /// The frame that was current when this one was minted.
    pub fn mother(&self) -> Option<Frame> {
        self.node().mother.map(|mother| {
            // SAFETY: we hold a reference to self, which holds one to mother.
            unsafe { mother.as_ref() }.refcount.increment();
            Frame::from_node(mother)
        })
    }

    /// Walk the mother chain, nearest ancestor first, ending at the root.
    pub fn ancestors(&self) -> Ancestors {
        Ancestors {
            next: self.mother(),
        }
    }

    /// Frame ids from the root down to this frame.
    pub fn lineage(&self) -> Vec<FrameId> {
        let mut ids = Vec::with_capacity(self.depth() as usize + 1);
        ids.push(self.id());
        ids.extend(self.ancestors().map(|f| f.id()));
        ids.reverse();
        ids
    }

    /// Whether two handles refer to the same frame.
    pub fn ptr_eq(&self, other: &Frame) -> bool {
        ptr::eq(self.as_ptr(), other.as_ptr())
    }

    pub(crate) fn set_label(&self, label: &'static str) {
        let _ = self.node().label.set(label);
    }

    /// Mark the frame running. Returns `true` for the first activation of a
    /// non-root frame, `false` for the root or an already running frame.
    pub(crate) fn activate(&self) -> bool {
        if self.is_root() {
            return false;
        }
        match self.node().state.compare_exchange(
            FrameState::Pending as u8,
            FrameState::Running as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => true,
            Err(s) if FrameState::from(s) == FrameState::Running => false,
            Err(_) => contract_violation(&OG102),
        }
    }

    /// Mark the frame finished after its first activation ended. Returns
    /// `false` if the frame was not running.
    pub(crate) fn try_retire(&self) -> bool {
        self.node()
            .state
            .compare_exchange(
                FrameState::Running as u8,
                FrameState::Finished as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Park the displaced register occupant inside this frame.
    pub(crate) fn store_saved(&self, previous: Option<Frame>) {
        let raw = previous.map_or(ptr::null_mut(), |f| f.into_raw().as_ptr());
        let old = self.node().saved_previous.swap(raw, Ordering::AcqRel);
        if !old.is_null() {
            contract_violation(&OG901);
        }
    }

    /// Take back the occupant parked by [`Frame::store_saved`].
    pub(crate) fn take_saved(&self) -> Option<Frame> {
        let raw = self.node().saved_previous.swap(ptr::null_mut(), Ordering::AcqRel);
        // SAFETY: the pointer carried the reference moved in by store_saved.
        NonNull::new(raw).map(|node| unsafe { Frame::from_raw(node) })
    }
}

impl Clone for Frame {
    fn clone(&self) -> Self {
        self.node().refcount.increment();
        Frame::from_node(self.node)
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        release(self.node);
    }
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Frame {}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("id", &self.id())
            .field("depth", &self.depth())
            .field("state", &self.state())
            .field("refs", &self.ref_count())
            .field("label", &self.label())
            .finish()
    }
}

/// Iterator over a frame's ancestors. See [`Frame::ancestors`].
pub struct Ancestors {
    next: Option<Frame>,
}

impl Iterator for Ancestors {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        let current = self.next.take()?;
        self.next = current.mother();
        Some(current)
    }
}
