//! Frame lifecycle event listeners.
//!
//! Listeners are opt-in: nothing is dispatched unless
//! [`GraphConfig::events`](crate::GraphConfig) is set and at least one
//! listener is registered. Listeners run synchronously on the thread that
//! caused the event, outside of any lock, so they may query the graph.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::ThreadId;

use crate::core::frame::{Depth, FrameId};
use crate::sync::mutex::Mutex;

/// A frame lifecycle event.
#[derive(Debug, Clone)]
pub enum FrameEvent {
    /// `init` minted a frame.
    Created {
        id: FrameId,
        mother: FrameId,
        depth: Depth,
    },
    /// A frame was installed as the current frame of a thread.
    Activated {
        id: FrameId,
        depth: Depth,
        label: Option<&'static str>,
        thread_id: ThreadId,
        nested: bool,
    },
    /// A frame's activation ended and the previous frame was restored.
    Retired {
        id: FrameId,
        thread_id: ThreadId,
        nested: bool,
    },
    /// The last reference to a frame was released.
    Destroyed {
        id: FrameId,
        depth: Depth,
        remaining: usize,
    },
}

impl FrameEvent {
    /// The frame this event is about.
    pub fn frame_id(&self) -> FrameId {
        match self {
            FrameEvent::Created { id, .. }
            | FrameEvent::Activated { id, .. }
            | FrameEvent::Retired { id, .. }
            | FrameEvent::Destroyed { id, .. } => *id,
        }
    }
}

/// Handle returned by [`on_frame_event`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&FrameEvent) + Send + Sync>;

static LISTENERS: Mutex<Vec<(ListenerId, Listener)>> = Mutex::new(Vec::new());
static HAS_LISTENERS: AtomicBool = AtomicBool::new(false);
static NEXT_LISTENER: AtomicU64 = AtomicU64::new(0);

/// Register a listener for frame events.
pub fn on_frame_event<F>(listener: F) -> ListenerId
where
    F: Fn(&FrameEvent) + Send + Sync + 'static,
{
    let id = ListenerId(NEXT_LISTENER.fetch_add(1, Ordering::Relaxed));
    let mut listeners = LISTENERS.lock();
    listeners.push((id, Arc::new(listener)));
    HAS_LISTENERS.store(true, Ordering::Release);
    id
}

/// Unregister a listener. Returns `false` if it was not registered.
pub fn remove_frame_listener(id: ListenerId) -> bool {
    let mut listeners = LISTENERS.lock();
    let before = listeners.len();
    listeners.retain(|(lid, _)| *lid != id);
    HAS_LISTENERS.store(!listeners.is_empty(), Ordering::Release);
    listeners.len() != before
}

/// Whether dispatching is worth building an event for.
#[inline]
pub(crate) fn has_listeners() -> bool {
    HAS_LISTENERS.load(Ordering::Acquire)
}

/// Deliver an event to every listener.
pub(crate) fn dispatch(event: &FrameEvent) {
    let snapshot: Vec<Listener> = {
        let listeners = LISTENERS.lock();
        listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
    };
    for listener in snapshot {
        listener(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_register_dispatch_remove() {
        let seen = Arc::new(AtomicUsize::new(0));
        let target = FrameId::from_raw(u64::MAX - 7);

        let counter = Arc::clone(&seen);
        let id = on_frame_event(move |event| {
            if event.frame_id() == target {
                counter.fetch_add(1, Ordering::Relaxed);
            }
        });

        let event = FrameEvent::Destroyed {
            id: target,
            depth: 3,
            remaining: 0,
        };
        dispatch(&event);
        assert_eq!(seen.load(Ordering::Relaxed), 1);

        assert!(remove_frame_listener(id));
        assert!(!remove_frame_listener(id));

        dispatch(&event);
        assert_eq!(seen.load(Ordering::Relaxed), 1);
    }
}
