//! Worker threads and the queue they share.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_queue::SegQueue;

use crate::api::lifecycle::{begin, close_activation, end, Checks, ResolveMode};
use crate::api::owner::{OwnerSlot, TaskOwner};
use crate::core::frame::Frame;
use crate::sync::mutex::{Condvar, Mutex};

/// Why a task could not start, in the shape of a panic payload.
pub(crate) type Payload = Box<dyn Any + Send + 'static>;

/// How a queued task's frame reaches the worker.
pub(crate) enum Carrier {
    /// Kept in the per-task owner slot, resolved with `PoolOwner`.
    Owner(OwnerSlot),
    /// Carried in the payload, resolved with `Handoff`.
    Handoff(Frame),
}

/// A queued task.
pub(crate) struct Job {
    pub(crate) carrier: Carrier,
    pub(crate) label: &'static str,
    /// Called exactly once: with `Ok` to run the task under its frame, or
    /// with the activation failure. Never unwinds.
    pub(crate) run: Box<dyn FnOnce(Result<(), Payload>) + Send + 'static>,
}

/// State shared between the pool handle and its workers.
pub(crate) struct Shared {
    queue: SegQueue<Job>,
    idle: Mutex<()>,
    wake: Condvar,
    shutdown: AtomicBool,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self {
            queue: SegQueue::new(),
            idle: Mutex::new(()),
            wake: Condvar::new(),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Queue a job and wake one idle worker.
    pub(crate) fn push(&self, job: Job) {
        self.queue.push(job);
        let _guard = self.idle.lock();
        self.wake.notify_one();
    }

    /// Ask workers to exit once the queue is drained.
    pub(crate) fn close(&self) {
        self.shutdown.store(true, Ordering::Release);
        let _guard = self.idle.lock();
        self.wake.notify_all();
    }

    pub(crate) fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Next job, blocking while the queue is empty. `None` after `close`
    /// once nothing is left.
    fn next_job(&self) -> Option<Job> {
        loop {
            if let Some(job) = self.queue.pop() {
                return Some(job);
            }

            let guard = self.idle.lock();
            if !self.queue.is_empty() {
                continue;
            }
            if self.shutdown.load(Ordering::Acquire) {
                return None;
            }
            drop(self.wake.wait(guard));
        }
    }
}

/// One worker thread. Holds the owner slot of the task it is running.
pub(crate) struct WorkerThread {
    index: usize,
    slot: Option<OwnerSlot>,
}

impl WorkerThread {
    pub(crate) fn new(index: usize) -> Self {
        Self { index, slot: None }
    }

    pub(crate) fn run_loop(mut self, shared: &Shared) {
        #[cfg(feature = "log")]
        log::trace!("worker {} started", self.index);

        while let Some(job) = shared.next_job() {
            self.run_job(job);
        }

        #[cfg(feature = "log")]
        log::trace!("worker {} exiting", self.index);
    }

    /// Activate, run and retire one job. Nothing here unwinds out of the
    /// worker, so a broken activation costs the job, not the thread.
    fn run_job(&mut self, job: Job) {
        let Job {
            carrier,
            label,
            run,
        } = job;

        let activated = panic::catch_unwind(AssertUnwindSafe(|| match carrier {
            Carrier::Owner(slot) => {
                self.slot = Some(slot);
                begin(ResolveMode::PoolOwner(&*self), Some(label))
            }
            Carrier::Handoff(frame) => begin(ResolveMode::Handoff(frame), Some(label)),
        }));

        match activated {
            Ok(Ok(())) => {
                run(Ok(()));
                if panic::catch_unwind(end).is_err() {
                    // Workers start every job with an empty register, so
                    // this only undoes the job's own activation, if still open.
                    close_activation(Checks::Skip);
                    #[cfg(feature = "log")]
                    log::warn!("worker {} could not retire '{}'", self.index, label);
                }
            }
            Ok(Err(err)) => {
                #[cfg(feature = "log")]
                log::warn!("worker {} could not activate '{}': {}", self.index, label, err);
                run(Err(Box::new(err)));
            }
            Err(payload) => {
                #[cfg(feature = "log")]
                log::warn!("worker {} could not activate '{}'", self.index, label);
                run(Err(payload));
            }
        }

        // Slot teardown releases the slot's reference.
        self.slot = None;
    }
}

impl TaskOwner for WorkerThread {
    fn task_owner(&self) -> Option<Frame> {
        self.slot.as_ref().and_then(OwnerSlot::get)
    }
}
