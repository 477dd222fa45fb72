use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, select, Receiver, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tracing::{error, info, warn};

use super::config::PoolConfig;
use super::metrics::{PoolState, PoolStats};
use super::worker::{self, Shared, Task};
use crate::error::{Error, Result};

/// Why [`WorkerPool::try_submit`] refused a task. The task is handed back.
#[derive(Error)]
pub enum TrySubmitError {
    /// The queue is at capacity.
    #[error("worker pool queue is full")]
    Full(Task),

    /// The pool has been stopped.
    #[error("worker pool is closed")]
    Closed(Task),
}

impl TrySubmitError {
    /// Recovers the rejected task.
    pub fn into_task(self) -> Task {
        match self {
            Self::Full(task) | Self::Closed(task) => task,
        }
    }

    /// Returns `true` for [`TrySubmitError::Full`].
    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full(_))
    }
}

impl fmt::Debug for TrySubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(_) => f.write_str("Full(..)"),
            Self::Closed(_) => f.write_str("Closed(..)"),
        }
    }
}

impl TryFrom<TrySubmitError> for Error {
    type Error = TrySubmitError;

    /// Only `Closed` maps to [`Error::PoolClosed`]; a `Full` rejection is
    /// retryable and comes back unchanged, task included.
    fn try_from(err: TrySubmitError) -> std::result::Result<Self, TrySubmitError> {
        match err {
            TrySubmitError::Closed(_) => Ok(Error::PoolClosed),
            full @ TrySubmitError::Full(_) => Err(full),
        }
    }
}

/// A fixed set of threads executing tasks from a bounded FIFO queue.
///
/// # Lifecycle
///
/// ```text
///     new() ──► submit()* ──► start() ──► submit()* / wait() ──► stop()
///                 │                          │
///                 └── queued until start ────┘
/// ```
///
/// - Tasks are dequeued in submission order. With more than one worker they
///   may finish in any order.
/// - `submit` blocks while the queue is full, and fails with
///   [`Error::PoolClosed`] once `stop` has begun.
/// - `stop` closes the queue, lets workers drain everything already
///   accepted, then joins them. Dropping the pool calls `stop`.
/// - `stop` may run inside one of the pool's own tasks, directly or by
///   dropping the last handle. The calling worker is not joined; it finishes
///   the queue and exits on its own.
/// - Tasks still queued when no worker is left to run them, because the pool
///   never started or panics took every worker down, are dropped at `stop`
///   and counted in [`PoolStats::discarded`].
///
/// # Example
///
/// ```rust
/// use pacekit::WorkerPool;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let pool = WorkerPool::new(3);
/// pool.start();
///
/// let counter = Arc::new(AtomicUsize::new(0));
/// for _ in 0..10 {
///     let counter = Arc::clone(&counter);
///     pool.submit(move || {
///         counter.fetch_add(1, Ordering::SeqCst);
///     })
///     .unwrap();
/// }
///
/// pool.wait();
/// assert_eq!(counter.load(Ordering::SeqCst), 10);
/// pool.stop();
/// ```
pub struct WorkerPool {
    config: PoolConfig,

    /// `None` once stopped. Submitters hold the read lock for the whole
    /// send, so taking the write lock in `stop` means no send is in flight.
    sender: RwLock<Option<Sender<Task>>>,
    receiver: Receiver<Task>,

    /// Never sent on. Dropping the sender wakes every blocked `submit`.
    shutdown_tx: Mutex<Option<Sender<()>>>,
    shutdown_rx: Receiver<()>,

    closed: AtomicBool,
    state: AtomicU8,

    /// Held across start and stop so the two never interleave.
    handles: Mutex<Vec<JoinHandle<()>>>,

    shared: Arc<Shared>,
}

impl WorkerPool {
    /// Creates a pool of `workers` threads with the default queue capacity
    /// (`2 × workers`). Zero workers is treated as one. No thread is spawned
    /// until [`start`](Self::start).
    pub fn new(workers: usize) -> Self {
        Self::with_config(PoolConfig::new(workers))
    }

    /// Creates a pool from a full configuration.
    pub fn with_config(config: PoolConfig) -> Self {
        let config = config.normalized();
        let (sender, receiver) = bounded(config.queue_capacity);
        let (shutdown_tx, shutdown_rx) = bounded(0);

        Self {
            shared: Arc::new(Shared::new(config.panic_policy)),
            config,
            sender: RwLock::new(Some(sender)),
            receiver,
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            shutdown_rx,
            closed: AtomicBool::new(false),
            state: AtomicU8::new(PoolState::Created as u8),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Spawns the worker threads. Has no effect unless the pool is in
    /// [`PoolState::Created`].
    ///
    /// A thread the OS refuses to spawn is logged and skipped; the pool runs
    /// with the workers it got.
    pub fn start(&self) {
        let mut handles = self.handles.lock();
        if self.state() != PoolState::Created {
            return;
        }

        for id in 0..self.config.workers {
            let tasks = self.receiver.clone();
            let shared = Arc::clone(&self.shared);
            self.shared.worker_spawning();

            let spawned = thread::Builder::new()
                .name(format!("{}-{}", self.config.thread_name, id))
                .spawn(move || worker::run(id, tasks, &shared));

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    self.shared.worker_exited();
                    error!(worker = id, error = %err, "Failed to spawn worker thread");
                }
            }
        }

        self.set_state(PoolState::Started);
        info!(
            workers = handles.len(),
            queue_capacity = self.config.queue_capacity,
            "Worker pool started"
        );
    }

    /// Enqueues a task, blocking while the queue is full.
    ///
    /// Allowed before `start`; the task then waits for the workers. Returns
    /// [`Error::PoolClosed`] if the pool is stopping or stopped, including
    /// when `stop` begins while this call is blocked. A rejected task is
    /// never run.
    pub fn submit<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_closed() {
            return Err(Error::PoolClosed);
        }
        let sender = self.sender.read();
        let sender = sender.as_ref().ok_or(Error::PoolClosed)?;
        let task: Task = Box::new(task);

        self.shared.task_accepted();
        let sent = match sender.try_send(task) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(task)) => select! {
                send(sender, task) -> res => res.map_err(|_| Error::PoolClosed),
                recv(self.shutdown_rx) -> _ => Err(Error::PoolClosed),
            },
            Err(TrySendError::Disconnected(_)) => Err(Error::PoolClosed),
        };

        match sent {
            Ok(()) => {
                self.shared.submitted.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(err) => {
                self.shared.task_rejected();
                Err(err)
            }
        }
    }

    /// Enqueues a task without blocking.
    pub fn try_submit<F>(&self, task: F) -> std::result::Result<(), TrySubmitError>
    where
        F: FnOnce() + Send + 'static,
    {
        let task: Task = Box::new(task);
        if self.is_closed() {
            return Err(TrySubmitError::Closed(task));
        }
        let sender = self.sender.read();
        let Some(sender) = sender.as_ref() else {
            return Err(TrySubmitError::Closed(task));
        };

        self.shared.task_accepted();
        match sender.try_send(task) {
            Ok(()) => {
                self.shared.submitted.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(err) => {
                self.shared.task_rejected();
                Err(match err {
                    TrySendError::Full(task) => TrySubmitError::Full(task),
                    TrySendError::Disconnected(task) => TrySubmitError::Closed(task),
                })
            }
        }
    }

    /// Blocks until every accepted task has finished.
    ///
    /// Returns early, with a warning, when no worker is alive to run what is
    /// left: before `start`, or after panics took down every worker.
    /// Tasks submitted concurrently with `wait` may or may not be waited on.
    pub fn wait(&self) {
        let left = self.shared.wait_idle();
        if left > 0 {
            warn!(pending = left, "wait() returned with tasks pending and no live workers");
        }
    }

    /// Stops accepting tasks, drains the queue and joins every worker.
    ///
    /// Idempotent: later calls return once the first has finished. Tasks left
    /// queued with no worker to run them are discarded and logged. Called from
    /// a task on this pool, it joins every other worker and returns.
    pub fn stop(&self) {
        let mut handles = self.handles.lock();
        if self.state() == PoolState::Stopped {
            return;
        }

        self.closed.store(true, Ordering::Release);
        self.set_state(PoolState::Stopping);
        // Wake blocked submitters first; the write lock waits for them.
        drop(self.shutdown_tx.lock().take());
        drop(self.sender.write().take());

        let current = thread::current().id();
        let mut crashed = 0;
        let mut detached = false;
        for handle in handles.drain(..) {
            if handle.thread().id() == current {
                // Stopping from inside a task; this worker exits after its task.
                detached = true;
                continue;
            }
            if handle.join().is_err() {
                crashed += 1;
            }
        }

        // With every worker gone nobody else will ever receive what is left.
        if !detached {
            let mut discarded = 0;
            while self.receiver.try_recv().is_ok() {
                discarded += 1;
            }
            if discarded > 0 {
                self.shared.tasks_discarded(discarded);
                warn!(
                    discarded,
                    "Worker pool stopped with no workers left, queued tasks discarded"
                );
            }
        }

        self.set_state(PoolState::Stopped);
        info!(
            completed = self.shared.completed.load(Ordering::Relaxed),
            panicked = self.shared.panicked.load(Ordering::Relaxed),
            crashed_workers = crashed,
            "Worker pool stopped"
        );
    }

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> PoolState {
        PoolState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// `true` once `stop` has begun.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Configured number of workers.
    #[inline]
    pub fn worker_count(&self) -> usize {
        self.config.workers
    }

    /// Maximum number of queued tasks.
    #[inline]
    pub fn queue_capacity(&self) -> usize {
        self.config.queue_capacity
    }

    /// Effective configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Snapshot of counters and state.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            state: self.state(),
            workers: self.config.workers,
            live_workers: self.shared.live_workers(),
            queue_capacity: self.config.queue_capacity,
            queued: self.receiver.len(),
            pending: self.shared.pending(),
            submitted: self.shared.submitted.load(Ordering::Relaxed),
            completed: self.shared.completed.load(Ordering::Relaxed),
            panicked: self.shared.panicked.load(Ordering::Relaxed),
            discarded: self.shared.discarded.load(Ordering::Relaxed),
        }
    }

    fn set_state(&self, state: PoolState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("state", &self.state())
            .field("workers", &self.config.workers)
            .field("queue_capacity", &self.config.queue_capacity)
            .field("pending", &self.shared.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::config::PanicPolicy;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;
    use std::time::Duration;

    fn counting_task(counter: &Arc<AtomicUsize>) -> impl FnOnce() + Send + 'static {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_runs_all_tasks() {
        let pool = WorkerPool::new(3);
        pool.start();

        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..10 {
            pool.submit(counting_task(&counter)).unwrap();
        }

        pool.wait();
        assert_eq!(counter.load(Ordering::SeqCst), 10);

        let stats = pool.stats();
        assert_eq!(stats.submitted, 10);
        assert_eq!(stats.completed, 10);
        assert!(stats.is_idle());

        pool.stop();
        assert_eq!(pool.state(), PoolState::Stopped);
    }

    #[test]
    fn test_stop_drains_queue() {
        let pool = WorkerPool::with_config(PoolConfig::new(2).with_queue_capacity(100));
        let counter = Arc::new(AtomicUsize::new(0));

        pool.start();
        for _ in 0..50 {
            pool.submit({
                let task = counting_task(&counter);
                move || {
                    thread::sleep(Duration::from_micros(200));
                    task();
                }
            })
            .unwrap();
        }
        pool.stop();

        assert_eq!(counter.load(Ordering::SeqCst), 50);
        assert_eq!(pool.stats().live_workers, 0);
    }

    #[test]
    fn test_submit_after_stop() {
        let pool = WorkerPool::new(1);
        pool.start();
        pool.stop();

        let ran = Arc::new(AtomicUsize::new(0));
        assert_eq!(pool.submit(counting_task(&ran)), Err(Error::PoolClosed));
        assert!(pool.try_submit(counting_task(&ran)).is_err());
        thread::sleep(Duration::from_millis(20));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(pool.stats().pending, 0);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let pool = WorkerPool::new(2);
        pool.start();
        pool.stop();
        pool.stop();
        assert_eq!(pool.state(), PoolState::Stopped);
    }

    #[test]
    fn test_start_is_idempotent() {
        let pool = WorkerPool::new(2);
        pool.start();
        pool.start();
        assert_eq!(pool.stats().live_workers, 2);

        pool.stop();
        pool.start();
        assert_eq!(pool.state(), PoolState::Stopped);
        assert_eq!(pool.stats().live_workers, 0);
    }

    #[test]
    fn test_single_worker_fifo() {
        let pool = WorkerPool::with_config(PoolConfig::new(1).with_queue_capacity(64));
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..20 {
            let order = Arc::clone(&order);
            pool.submit(move || order.lock().push(i)).unwrap();
        }
        pool.start();
        pool.wait();

        assert_eq!(*order.lock(), (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_submit_blocks_when_full() {
        let pool = Arc::new(WorkerPool::with_config(
            PoolConfig::new(1).with_queue_capacity(1),
        ));
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let (started_tx, started_rx) = mpsc::channel::<()>();

        pool.start();
        pool.submit(move || {
            started_tx.send(()).unwrap();
            release_rx.recv().unwrap();
        })
        .unwrap();
        started_rx.recv().unwrap();

        // Worker is busy; this fills the single slot.
        pool.submit(|| {}).unwrap();
        assert!(pool.try_submit(|| {}).unwrap_err().is_full());

        let (done_tx, done_rx) = mpsc::channel();
        let submitter = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                let result = pool.submit(|| {});
                done_tx.send(()).unwrap();
                result
            })
        };

        assert!(done_rx.recv_timeout(Duration::from_millis(50)).is_err());
        release_tx.send(()).unwrap();
        assert!(submitter.join().unwrap().is_ok());

        pool.wait();
        assert_eq!(pool.stats().completed, 3);
    }

    #[test]
    fn test_blocked_submit_fails_on_stop() {
        let pool = Arc::new(WorkerPool::with_config(
            PoolConfig::new(1).with_queue_capacity(1),
        ));
        pool.submit(|| {}).unwrap();

        let submitter = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.submit(|| {}))
        };

        thread::sleep(Duration::from_millis(50));
        pool.stop();

        assert_eq!(submitter.join().unwrap(), Err(Error::PoolClosed));
        let stats = pool.stats();
        assert_eq!(stats.discarded, 1);
        assert_eq!(stats.pending, 0);
    }

    #[test]
    fn test_wait_before_start_returns() {
        let pool = WorkerPool::new(2);
        pool.submit(|| {}).unwrap();
        pool.wait();
        assert_eq!(pool.stats().pending, 1);

        pool.start();
        pool.wait();
        assert_eq!(pool.stats().pending, 0);
    }

    #[test]
    fn test_isolate_policy_keeps_workers() {
        let pool = WorkerPool::with_config(
            PoolConfig::new(2).with_panic_policy(PanicPolicy::Isolate),
        );
        let counter = Arc::new(AtomicUsize::new(0));
        pool.start();

        for i in 0..6 {
            if i % 2 == 0 {
                pool.submit(|| panic!("task failure")).unwrap();
            } else {
                pool.submit(counting_task(&counter)).unwrap();
            }
        }
        pool.wait();

        let stats = pool.stats();
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(stats.panicked, 3);
        assert_eq!(stats.live_workers, 2);
    }

    #[test]
    fn test_propagate_policy_loses_worker() {
        let pool = WorkerPool::new(2);
        pool.start();

        pool.submit(|| panic!("task failure")).unwrap();
        pool.wait();

        // The dying worker decrements `live_workers` after the task guard.
        for _ in 0..100 {
            if pool.stats().live_workers == 1 {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        let stats = pool.stats();
        assert_eq!(stats.panicked, 1);
        assert_eq!(stats.live_workers, 1);
        assert!(stats.is_degraded());

        let counter = Arc::new(AtomicUsize::new(0));
        pool.submit(counting_task(&counter)).unwrap();
        pool.wait();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        pool.stop();
    }

    #[test]
    fn test_zero_workers_coerced() {
        let pool = WorkerPool::new(0);
        assert_eq!(pool.worker_count(), 1);
        assert_eq!(pool.queue_capacity(), 2);
    }

    #[test]
    fn test_worker_thread_names() {
        let pool = WorkerPool::with_config(PoolConfig::new(1).with_thread_name("named"));
        let (tx, rx) = mpsc::channel();
        pool.start();
        pool.submit(move || {
            tx.send(thread::current().name().map(str::to_owned)).unwrap();
        })
        .unwrap();

        assert_eq!(rx.recv().unwrap().as_deref(), Some("named-0"));
    }

    #[test]
    fn test_drop_stops_pool() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let pool = WorkerPool::new(2);
            pool.start();
            for _ in 0..8 {
                pool.submit(counting_task(&counter)).unwrap();
            }
        }
        assert_eq!(counter.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn test_try_submit_error_conversion() {
        let pool = WorkerPool::new(1);
        pool.stop();
        let err = pool.try_submit(|| {}).unwrap_err();
        assert!(!err.is_full());
        assert_eq!(format!("{err:?}"), "Closed(..)");
        assert_eq!(Error::try_from(err).ok(), Some(Error::PoolClosed));
    }

    #[test]
    fn test_full_is_not_converted_to_closed() {
        let pool = WorkerPool::with_config(PoolConfig::new(1).with_queue_capacity(1));
        pool.try_submit(|| {}).unwrap();

        let err = pool.try_submit(|| {}).unwrap_err();
        assert!(err.is_full());
        let err = Error::try_from(err).unwrap_err();
        assert!(err.is_full());
        assert!(!pool.is_closed());

        // The queued task still runs once the pool starts.
        pool.start();
        pool.wait();
        assert_eq!(pool.stats().completed, 1);
    }

    #[test]
    fn test_stop_discards_tasks_orphaned_by_panics() {
        let pool = WorkerPool::new(1);
        let ran = Arc::new(AtomicUsize::new(0));

        pool.submit(|| panic!("worker goes down")).unwrap();
        let counter = Arc::clone(&ran);
        pool.submit(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        pool.start();
        pool.wait();
        pool.stop();

        let stats = pool.stats();
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(stats.state, PoolState::Stopped);
        assert_eq!(stats.live_workers, 0);
        assert_eq!(stats.panicked, 1);
        assert_eq!(stats.discarded, 1);
        assert_eq!(stats.pending, 0);
        assert_eq!(stats.queued, 0);
    }

    #[test]
    fn test_drop_last_handle_inside_task() {
        let pool = Arc::new(WorkerPool::new(2));
        pool.start();

        let (go_tx, go_rx) = mpsc::channel::<()>();
        let (done_tx, done_rx) = mpsc::channel();
        let last = Arc::clone(&pool);
        pool.submit(move || {
            go_rx.recv().unwrap();
            let dropped = panic::catch_unwind(AssertUnwindSafe(move || drop(last)));
            done_tx.send(dropped.is_ok()).unwrap();
        })
        .unwrap();

        drop(pool);
        go_tx.send(()).unwrap();
        assert_eq!(done_rx.recv_timeout(Duration::from_secs(5)), Ok(true));
    }
}
