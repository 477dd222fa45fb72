//! Pool lifecycle state and statistics snapshots.

use std::fmt;

/// Lifecycle of a [`WorkerPool`](crate::WorkerPool).
///
/// ```text
///     Created ──start()──► Started ──stop()──► Stopping ──workers joined──► Stopped
///        │                                                                    ▲
///        └────────────────────────────stop()──────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PoolState {
    /// Constructed, no worker threads yet. Tasks may be queued.
    Created = 0,
    /// Workers are running.
    Started = 1,
    /// Shutdown signaled; no new tasks accepted, queue draining.
    Stopping = 2,
    /// Every worker has exited.
    Stopped = 3,
}

impl PoolState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Created,
            1 => Self::Started,
            2 => Self::Stopping,
            _ => Self::Stopped,
        }
    }

    /// Returns `true` in `Created` and `Started`, where `submit` can succeed.
    pub fn accepts_tasks(&self) -> bool {
        matches!(self, Self::Created | Self::Started)
    }
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Started => "started",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Point-in-time statistics of a worker pool.
///
/// Counters are read one by one without a global lock, so under load the
/// fields can disagree by the few tasks that finished between reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    /// Lifecycle state.
    pub state: PoolState,

    /// Configured worker count.
    pub workers: usize,

    /// Worker threads currently alive.
    pub live_workers: usize,

    /// Queue capacity.
    pub queue_capacity: usize,

    /// Tasks waiting in the queue.
    pub queued: usize,

    /// Tasks accepted but not yet finished (queued or running).
    pub pending: usize,

    /// Tasks accepted since construction.
    pub submitted: u64,

    /// Tasks that returned normally.
    pub completed: u64,

    /// Tasks that panicked.
    pub panicked: u64,

    /// Tasks dropped unexecuted at stop because no worker was left to run
    /// them: the pool never started, or panics took every worker down.
    pub discarded: u64,
}

impl PoolStats {
    /// No task is queued or running.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.pending == 0
    }

    /// Running with fewer live workers than configured, because panicking
    /// tasks took some down. Always `false` outside [`PoolState::Started`].
    #[inline]
    pub fn is_degraded(&self) -> bool {
        self.state == PoolState::Started && self.live_workers < self.workers
    }

    /// Share of the queue in use, `0.0` to `1.0`.
    pub fn queue_utilization(&self) -> f64 {
        if self.queue_capacity == 0 {
            0.0
        } else {
            self.queued as f64 / self.queue_capacity as f64
        }
    }

    /// Multi-line report suitable for logs.
    pub fn summary(&self) -> String {
        format!(
            "WorkerPool Stats ({}):\n\
             ├─ Workers: {}/{} alive\n\
             ├─ Queue: {}/{} ({:.0}%)\n\
             └─ Tasks:\n\
                ├─ Submitted: {}\n\
                ├─ Completed: {}\n\
                ├─ Panicked: {}\n\
                ├─ Discarded: {}\n\
                └─ Pending: {}",
            self.state,
            self.live_workers,
            self.workers,
            self.queued,
            self.queue_capacity,
            self.queue_utilization() * 100.0,
            self.submitted,
            self.completed,
            self.panicked,
            self.discarded,
            self.pending,
        )
    }
}

impl fmt::Display for PoolStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}
