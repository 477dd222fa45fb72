//! Worker loop and the bookkeeping shared between the pool and its threads.
//!
//! Every accepted task raises `pending` before it is enqueued and lowers it
//! exactly once when it finishes, whether it returned, panicked, or was
//! discarded. The decrement lives in a drop guard so unwinding cannot skip
//! it.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crossbeam_channel::Receiver;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, error};

use super::config::PanicPolicy;

/// A unit of work accepted by the pool.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Default)]
struct Progress {
    pending: usize,
    live_workers: usize,
}

/// State observed by both the pool handle and its workers.
#[derive(Debug)]
pub(crate) struct Shared {
    progress: Mutex<Progress>,
    changed: Condvar,
    panic_policy: PanicPolicy,
    pub(crate) submitted: AtomicU64,
    pub(crate) completed: AtomicU64,
    pub(crate) panicked: AtomicU64,
    pub(crate) discarded: AtomicU64,
}

impl Shared {
    pub(crate) fn new(panic_policy: PanicPolicy) -> Self {
        Self {
            progress: Mutex::new(Progress::default()),
            changed: Condvar::new(),
            panic_policy,
            submitted: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            panicked: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        }
    }

    /// Called before a task is handed to the queue.
    pub(crate) fn task_accepted(&self) {
        self.progress.lock().pending += 1;
    }

    /// Undoes `task_accepted` for a task the queue refused.
    pub(crate) fn task_rejected(&self) {
        self.finish_tasks(1);
    }

    /// Tasks dropped without running.
    pub(crate) fn tasks_discarded(&self, count: usize) {
        self.discarded.fetch_add(count as u64, Ordering::Relaxed);
        self.finish_tasks(count);
    }

    pub(crate) fn worker_spawning(&self) {
        self.progress.lock().live_workers += 1;
    }

    pub(crate) fn worker_exited(&self) {
        let mut progress = self.progress.lock();
        progress.live_workers = progress.live_workers.saturating_sub(1);
        self.changed.notify_all();
    }

    pub(crate) fn pending(&self) -> usize {
        self.progress.lock().pending
    }

    pub(crate) fn live_workers(&self) -> usize {
        self.progress.lock().live_workers
    }

    /// Blocks until nothing is pending or no worker is left to make progress.
    /// Returns the number of tasks still pending.
    pub(crate) fn wait_idle(&self) -> usize {
        let mut progress = self.progress.lock();
        while progress.pending > 0 && progress.live_workers > 0 {
            self.changed.wait(&mut progress);
        }
        progress.pending
    }

    fn finish_tasks(&self, count: usize) {
        let mut progress = self.progress.lock();
        progress.pending = progress.pending.saturating_sub(count);
        if progress.pending == 0 {
            self.changed.notify_all();
        }
    }
}

/// Marks one task finished when dropped.
struct TaskGuard<'a> {
    shared: &'a Shared,
    caught_panic: bool,
}

impl Drop for TaskGuard<'_> {
    fn drop(&mut self) {
        if self.caught_panic || thread::panicking() {
            self.shared.panicked.fetch_add(1, Ordering::Relaxed);
        } else {
            self.shared.completed.fetch_add(1, Ordering::Relaxed);
        }
        self.shared.finish_tasks(1);
    }
}

/// Marks the worker gone when dropped.
struct WorkerGuard<'a> {
    shared: &'a Shared,
    id: usize,
}

impl Drop for WorkerGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            error!(worker = self.id, "Task panicked, worker exiting");
        } else {
            debug!(worker = self.id, "Worker exited");
        }
        self.shared.worker_exited();
    }
}

/// Runs tasks until the queue is closed and drained.
pub(crate) fn run(id: usize, tasks: Receiver<Task>, shared: &Shared) {
    let _worker = WorkerGuard { shared, id };
    debug!(worker = id, "Worker started");

    while let Ok(task) = tasks.recv() {
        let mut guard = TaskGuard {
            shared,
            caught_panic: false,
        };

        match shared.panic_policy {
            PanicPolicy::Propagate => task(),
            PanicPolicy::Isolate => {
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
                    guard.caught_panic = true;
                    error!(
                        worker = id,
                        message = panic_message(payload.as_ref()),
                        "Task panicked, worker continues"
                    );
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
