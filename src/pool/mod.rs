//! A small worker pool that carries frames across threads.
//!
//! Every submitted task runs under a child of the submitter's current
//! frame, so `current_depth()` inside a task is one more than at the
//! submission site, and tasks submitted from inside a task nest further.
//!
//! ```rust,no_run
//! use opgraph::pool::WorkerPool;
//! use opgraph::{GraphConfig, PoolConfig};
//!
//! opgraph::startup(GraphConfig::default()).unwrap();
//! let pool = WorkerPool::new(PoolConfig::default()).unwrap();
//!
//! let handle = pool.submit("depth", opgraph::current_depth).unwrap();
//! assert_eq!(handle.wait().unwrap(), 1);
//! ```

mod worker;

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::api::config::PoolConfig;
use crate::api::error::AllocError;
use crate::api::lifecycle::init;
use crate::api::owner::OwnerSlot;
use crate::sync::mutex::{Condvar, Mutex};

use worker::{Carrier, Job, Payload, Shared, WorkerThread};

/// Fixed-size pool of worker threads.
///
/// Dropping the pool runs every task already queued, then joins the
/// workers.
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn the workers described by `config`.
    pub fn new(config: PoolConfig) -> io::Result<Self> {
        let shared = Arc::new(Shared::new());
        let count = config.workers.max(1);
        let mut workers = Vec::with_capacity(count);

        for index in 0..count {
            let worker_shared = Arc::clone(&shared);
            let spawned = thread::Builder::new()
                .name(format!("{}-{}", config.thread_name, index))
                .spawn(move || WorkerThread::new(index).run_loop(&worker_shared));

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(err) => {
                    let pool = Self { shared, workers };
                    drop(pool);
                    return Err(err);
                }
            }
        }

        #[cfg(feature = "log")]
        log::debug!("worker pool started with {} threads", count);

        Ok(Self { shared, workers })
    }

    /// Number of worker threads.
    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    /// Approximate number of tasks waiting for a worker.
    pub fn queued(&self) -> usize {
        self.shared.queued()
    }

    /// Run `f` on a worker. The task's frame travels in its owner slot.
    pub fn submit<F, R>(&self, label: &'static str, f: F) -> Result<TaskHandle<R>, AllocError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let slot = OwnerSlot::claim()?;
        Ok(self.dispatch(Carrier::Owner(slot), label, f))
    }

    /// Run `f` on a worker. The task's frame travels in the task payload
    /// and is handed straight to `begin`.
    pub fn submit_direct<F, R>(
        &self,
        label: &'static str,
        f: F,
    ) -> Result<TaskHandle<R>, AllocError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let frame = init()?;
        Ok(self.dispatch(Carrier::Handoff(frame), label, f))
    }

    /// Run `f` on a worker without a way to wait for it.
    ///
    /// A panic in `f` is logged and otherwise ignored.
    pub fn execute<F>(&self, label: &'static str, f: F) -> Result<(), AllocError>
    where
        F: FnOnce() + Send + 'static,
    {
        let slot = OwnerSlot::claim()?;
        let run = move |activation: Result<(), Payload>| {
            let outcome = activation.and_then(|()| panic::catch_unwind(AssertUnwindSafe(f)));
            if outcome.is_err() {
                #[cfg(feature = "log")]
                log::warn!("task '{}' panicked", label);
            }
        };
        self.shared.push(Job {
            carrier: Carrier::Owner(slot),
            label,
            run: Box::new(run),
        });
        Ok(())
    }

    fn dispatch<F, R>(&self, carrier: Carrier, label: &'static str, f: F) -> TaskHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let completion = Arc::new(Completion::new());
        let sender = Arc::clone(&completion);
        let run = move |activation: Result<(), Payload>| {
            let result = activation.and_then(|()| panic::catch_unwind(AssertUnwindSafe(f)));
            sender.complete(result);
        };

        self.shared.push(Job {
            carrier,
            label,
            run: Box::new(run),
        });
        TaskHandle { completion }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shared.close();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers.len())
            .field("queued", &self.queued())
            .finish()
    }
}

/// Result cell shared between a task and its handle.
struct Completion<R> {
    result: Mutex<Option<thread::Result<R>>>,
    done: Condvar,
}

impl<R> Completion<R> {
    fn new() -> Self {
        Self {
            result: Mutex::new(None),
            done: Condvar::new(),
        }
    }

    fn complete(&self, result: thread::Result<R>) {
        let mut slot = self.result.lock();
        *slot = Some(result);
        self.done.notify_all();
    }
}

/// Handle to a submitted task.
pub struct TaskHandle<R> {
    completion: Arc<Completion<R>>,
}

impl<R> TaskHandle<R> {
    /// Block until the task has run. `Err` carries the task's panic
    /// payload, or the panic that kept the task from being activated.
    pub fn wait(self) -> thread::Result<R> {
        let mut slot = self.completion.result.lock();
        loop {
            if let Some(result) = slot.take() {
                return result;
            }
            slot = self.completion.done.wait(slot);
        }
    }

    /// Whether the task has produced its result.
    pub fn is_finished(&self) -> bool {
        self.completion.result.lock().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::lifecycle::{current_depth, current_frame};
    use crate::api::scope::run_sync;
    use crate::core::frame::FrameState;
    use crate::core::global::start_for_tests;

    fn pool(workers: usize) -> WorkerPool {
        WorkerPool::new(PoolConfig::default().with_workers(workers)).unwrap()
    }

    #[test]
    fn test_task_runs_one_level_deeper() {
        start_for_tests();
        let pool = pool(2);
        assert_eq!(pool.submit("top", current_depth).unwrap().wait().unwrap(), 1);
        assert_eq!(
            pool.submit_direct("direct", current_depth)
                .unwrap()
                .wait()
                .unwrap(),
            1
        );
    }

    #[test]
    fn test_submission_from_inside_op_nests() {
        start_for_tests();
        let pool = Arc::new(pool(2));

        let inner_pool = Arc::clone(&pool);
        let depth = run_sync("outer", move || {
            let child = inner_pool.submit("child", current_depth).unwrap();
            child.wait().unwrap()
        })
        .unwrap();
        assert_eq!(depth, 2);
    }

    #[test]
    fn test_task_frame_released_after_completion() {
        start_for_tests();
        let pool = pool(1);
        let frame = pool
            .submit("observe", current_frame)
            .unwrap()
            .wait()
            .unwrap();

        assert_eq!(frame.label(), Some("observe"));
        // Joining the worker guarantees `end` and slot teardown have run.
        drop(pool);
        assert_eq!(frame.state(), FrameState::Finished);
        assert_eq!(frame.ref_count(), 1);
    }

    #[test]
    fn test_panicking_task_is_contained() {
        start_for_tests();
        let pool = pool(1);
        let failed = pool
            .submit("boom", || -> u32 { panic!("task failure") })
            .unwrap();
        assert!(failed.wait().is_err());

        let after = pool.submit("after", current_depth).unwrap();
        assert_eq!(after.wait().unwrap(), 1);
    }

    #[test]
    fn test_execute_runs_every_task() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        start_for_tests();
        let ran = Arc::new(AtomicUsize::new(0));
        {
            let pool = pool(3);
            for _ in 0..50 {
                let ran = Arc::clone(&ran);
                pool.execute("count", move || {
                    ran.fetch_add(1, Ordering::Relaxed);
                })
                .unwrap();
            }
        }
        assert_eq!(ran.load(Ordering::Relaxed), 50);
    }
}
