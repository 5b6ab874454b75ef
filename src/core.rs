//! A single worker core: one OS thread draining its own `TaskQueue`
//! (`spec.md` §4.1). Guarantees: drain-on-stop, single closure in flight at
//! a time, non-blocking submission.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::task_queue::TaskQueue;

/// Identifies one core within a `CoresManager` pool.
pub type CoreId = usize;

struct Signal {
    mutex: Mutex<bool>,
    condvar: Condvar,
}

impl Signal {
    fn new() -> Self {
        Signal {
            mutex: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    fn notify(&self) {
        *self.mutex.lock() = true;
        self.condvar.notify_all();
    }

    /// Block until notified or the timeout elapses; used to avoid a busy
    /// loop between "queue empty" and "stop requested".
    fn wait_timeout(&self, timeout: std::time::Duration) {
        let mut guard = self.mutex.lock();
        if !*guard {
            self.condvar.wait_for(&mut guard, timeout);
        }
    }
}

/// A worker core, identified by a small integer, owning a FIFO task queue.
pub struct Core {
    id: CoreId,
    queue: Arc<TaskQueue>,
    stopped: Arc<AtomicBool>,
    wake: Arc<Signal>,
}

impl Core {
    pub fn id(&self) -> CoreId {
        self.id
    }

    /// Enqueue a closure for this core to run. Non-blocking: never waits
    /// for previously enqueued work, only takes the queue's lock.
    pub fn execute(&self, f: Box<dyn FnOnce() + Send>) {
        if self.stopped.load(Ordering::Acquire) {
            return;
        }
        self.queue.push(f);
        self.wake.notify();
    }

    /// Signal this core to stop accepting new work once drained. Existing
    /// queued closures still run.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        self.wake.notify();
    }
}

/// Spawns a core's dedicated worker thread and returns both a handle to the
/// `Core` (for submission/stop) and the `JoinHandle` the pool joins on
/// `close()`.
pub fn spawn(id: CoreId) -> (Arc<Core>, JoinHandle<()>) {
    let core = Arc::new(Core {
        id,
        queue: Arc::new(TaskQueue::new()),
        stopped: Arc::new(AtomicBool::new(false)),
        wake: Arc::new(Signal::new()),
    });

    let worker_queue = core.queue.clone();
    let worker_stopped = core.stopped.clone();
    let worker_wake = core.wake.clone();
    let handle = std::thread::Builder::new()
        .name(format!("block-scheduler-core-{id}"))
        .spawn(move || loop {
            match worker_queue.pop() {
                Some(task) => task(),
                None => {
                    if worker_stopped.load(Ordering::Acquire) {
                        debug!(core_id = id, "core drained, stopping");
                        return;
                    }
                    worker_wake.wait_timeout(std::time::Duration::from_millis(10));
                }
            }
        })
        .expect("failed to spawn core worker thread");

    (core, handle)
}
