//! Atomic reference count embedded in every frame.
//!
//! The count itself knows nothing about what it guards. The owner pairs it
//! with a free callback and runs that callback when [`RefCount::decrement`]
//! reports the transition to zero, which happens exactly once per count.

use std::sync::atomic::{fence, AtomicUsize, Ordering};

use crate::diagnostics::{contract_violation, OG103};

/// Counts above this are treated as a leak loop and abort, like `Arc`.
const MAX_REFCOUNT: usize = isize::MAX as usize;

/// An intrusive atomic reference count.
pub struct RefCount {
    count: AtomicUsize,
}

impl RefCount {
    /// Create a count with `initial` holders.
    pub const fn new(initial: usize) -> Self {
        Self {
            count: AtomicUsize::new(initial),
        }
    }

    /// Register one more holder.
    ///
    /// The caller must already hold a reference, so the count can never be
    /// resurrected from zero through this path.
    #[inline]
    pub fn increment(&self) {
        let old = self.count.fetch_add(1, Ordering::Relaxed);
        if old > MAX_REFCOUNT {
            std::process::abort();
        }
    }

    /// Drop one holder. Returns `true` when this call released the last one.
    ///
    /// Releasing a count that is already zero is a contract violation and
    /// panics.
    #[inline]
    #[must_use = "the last holder must run the free callback"]
    pub fn decrement(&self) -> bool {
        let old = self.count.fetch_sub(1, Ordering::Release);
        if old == 0 {
            self.count.store(0, Ordering::Relaxed);
            contract_violation(&OG103);
        }
        if old != 1 {
            return false;
        }
        // Synchronize with every earlier release before the owner tears down.
        fence(Ordering::Acquire);
        true
    }

    /// Current number of holders.
    #[inline]
    pub fn get(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for RefCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RefCount").field(&self.get()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_last_decrement_reports_zero() {
        let rc = RefCount::new(1);
        rc.increment();
        assert_eq!(rc.get(), 2);
        assert!(!rc.decrement());
        assert!(rc.decrement());
        assert_eq!(rc.get(), 0);
    }

    #[test]
    #[should_panic(expected = "OG103")]
    fn test_decrement_at_zero_is_fatal() {
        crate::diagnostics::suppress_diagnostics(true);
        let rc = RefCount::new(0);
        let _ = rc.decrement();
    }

    #[test]
    fn test_exactly_one_thread_sees_zero() {
        let rc = Arc::new(RefCount::new(0));
        for _ in 0..8 * 1000 {
            rc.increment();
        }

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let rc = Arc::clone(&rc);
                thread::spawn(move || (0..1000).filter(|_| rc.decrement()).count())
            })
            .collect();

        let zeros: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(zeros, 1);
        assert_eq!(rc.get(), 0);
    }
}
