//! Mutex and condition variable wrappers - parking_lot if available, std
//! otherwise.
//!
//! Both backends expose the same by-value `Condvar::wait`, so the listener
//! registry and the worker pool lock the same way under either feature set.
//! Frames never take these locks.

#[cfg(feature = "parking_lot")]
mod backend {
    pub use parking_lot::{Mutex, MutexGuard};

    /// Condition variable paired with [`Mutex`].
    pub struct Condvar(parking_lot::Condvar);

    impl Condvar {
        /// Create a new condition variable.
        pub const fn new() -> Self {
            Self(parking_lot::Condvar::new())
        }

        /// Block until notified, handing the re-acquired guard back.
        pub fn wait<'a, T>(&self, mut guard: MutexGuard<'a, T>) -> MutexGuard<'a, T> {
            self.0.wait(&mut guard);
            guard
        }

        /// Wake one waiter.
        pub fn notify_one(&self) {
            self.0.notify_one();
        }

        /// Wake every waiter.
        pub fn notify_all(&self) {
            self.0.notify_all();
        }
    }
}

#[cfg(not(feature = "parking_lot"))]
mod backend {
    use std::sync::{
        Condvar as StdCondvar, Mutex as StdMutex, MutexGuard as StdMutexGuard, PoisonError,
    };

    /// Thin wrapper around std::sync::Mutex.
    ///
    /// A panic while a lock is held leaves the protected data intact (a
    /// listener list, a pool's idle token, a task result), so poisoning is
    /// ignored.
    pub struct Mutex<T>(StdMutex<T>);

    impl<T> Mutex<T> {
        /// Create a new mutex.
        pub const fn new(value: T) -> Self {
            Self(StdMutex::new(value))
        }

        /// Lock the mutex.
        pub fn lock(&self) -> MutexGuard<'_, T> {
            MutexGuard(self.0.lock().unwrap_or_else(PoisonError::into_inner))
        }
    }

    /// Guard returned by [`Mutex::lock`].
    pub struct MutexGuard<'a, T>(StdMutexGuard<'a, T>);

    impl<'a, T> std::ops::Deref for MutexGuard<'a, T> {
        type Target = T;

        fn deref(&self) -> &Self::Target {
            &self.0
        }
    }

    impl<'a, T> std::ops::DerefMut for MutexGuard<'a, T> {
        fn deref_mut(&mut self) -> &mut Self::Target {
            &mut self.0
        }
    }

    /// Thin wrapper around std::sync::Condvar.
    pub struct Condvar(StdCondvar);

    impl Condvar {
        /// Create a new condition variable.
        pub const fn new() -> Self {
            Self(StdCondvar::new())
        }

        /// Block until notified, handing the re-acquired guard back.
        pub fn wait<'a, T>(&self, guard: MutexGuard<'a, T>) -> MutexGuard<'a, T> {
            MutexGuard(self.0.wait(guard.0).unwrap_or_else(PoisonError::into_inner))
        }

        /// Wake one waiter.
        pub fn notify_one(&self) {
            self.0.notify_one();
        }

        /// Wake every waiter.
        pub fn notify_all(&self) {
            self.0.notify_all();
        }
    }
}

pub use backend::{Condvar, Mutex, MutexGuard};
