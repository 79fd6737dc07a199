//! Relaxed atomic counters backing [`GraphStats`](crate::GraphStats).

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// A monotonically increasing event counter.
pub struct AtomicCounter(AtomicU64);

impl AtomicCounter {
    pub const fn new(initial: u64) -> Self {
        Self(AtomicU64::new(initial))
    }

    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for AtomicCounter {
    fn default() -> Self {
        Self::new(0)
    }
}

/// A gauge for values that go up and down, with a bounded reservation.
pub struct AtomicGauge(AtomicUsize);

impl AtomicGauge {
    pub const fn new(initial: usize) -> Self {
        Self(AtomicUsize::new(initial))
    }

    /// Add one and return the new value.
    pub fn increment(&self) -> usize {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Subtract one and return the new value.
    pub fn decrement(&self) -> usize {
        self.0.fetch_sub(1, Ordering::Relaxed) - 1
    }

    /// Add one unless the gauge already sits at `limit`.
    ///
    /// A `limit` of zero means unbounded. Returns the new value on success
    /// and the observed value on failure.
    pub fn try_increment(&self, limit: usize) -> Result<usize, usize> {
        if limit == 0 {
            return Ok(self.increment());
        }
        let mut current = self.0.load(Ordering::Relaxed);
        loop {
            if current >= limit {
                return Err(current);
            }
            match self.0.compare_exchange_weak(
                current,
                current + 1,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Ok(current + 1),
                Err(c) => current = c,
            }
        }
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }

    /// Update the maximum (for high-water marks).
    pub fn update_max(&self, value: usize) {
        let mut current = self.0.load(Ordering::Relaxed);
        while value > current {
            match self.0.compare_exchange_weak(
                current,
                value,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(c) => current = c,
            }
        }
    }
}

impl Default for AtomicGauge {
    fn default() -> Self {
        Self::new(0)
    }
}
