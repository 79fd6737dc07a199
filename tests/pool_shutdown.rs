//! Tasks still queued when the call graph shuts down.
//!
//! Kept to a single test since it takes the graph down.

use opgraph::pool::WorkerPool;
use opgraph::{current_depth, GraphConfig, PoolConfig};
use std::sync::mpsc;

#[test]
fn test_queued_task_fails_cleanly_after_shutdown() {
    opgraph::diagnostics::suppress_diagnostics(true);
    opgraph::startup(GraphConfig::default()).unwrap();

    let pool = WorkerPool::new(PoolConfig::default().with_workers(1)).unwrap();

    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let blocker = pool
        .submit("blocker", move || {
            let depth = current_depth();
            started_tx.send(()).unwrap();
            release_rx.recv().unwrap();
            depth
        })
        .unwrap();
    let queued = pool.submit("queued", current_depth).unwrap();

    started_rx.recv().unwrap();
    opgraph::shutdown();
    release_tx.send(()).unwrap();

    // The running task finished its op; only its `end` was refused.
    assert_eq!(blocker.wait().unwrap(), 1);

    // The queued task never activates, but its handle still resolves.
    let payload = queued.wait().unwrap_err();
    let message = payload
        .downcast_ref::<String>()
        .cloned()
        .unwrap_or_default();
    assert!(message.contains("OG201"), "unexpected payload: {:?}", message);

    // The worker survived with a clean register.
    opgraph::startup(GraphConfig::default()).unwrap();
    let after = pool.submit("after", current_depth).unwrap();
    assert_eq!(after.wait().unwrap(), 1);

    drop(pool);
    assert_eq!(opgraph::stats().live_frames, 0);
}
