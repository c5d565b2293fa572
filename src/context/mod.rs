//! Execution contexts behind the logical lanes.
//!
//! A dispatcher never owns threads. It forwards each job to an [`Executor`]
//! chosen by [`ThreadKind`], and the executor decides where and when the job
//! runs. Three implementations ship with the crate:
//!
//! - [`PumpQueue`]: a FIFO drained by an external loop (a frame or render
//!   pump) calling [`PumpQueue::pump`].
//! - [`WorkerPool`]: an elastic pool of OS threads with two priorities.
//! - [`InlineExecutor`]: runs the job immediately on the submitting thread.

mod pump;
mod worker_pool;

pub use pump::PumpQueue;
pub use worker_pool::{WorkPriority, WorkerPool, WorkerPoolHandle, WorkerTaskHandle};

use crate::types::ThreadKind;
use std::fmt;
use std::sync::Arc;

/// A unit of work handed to an executor.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// A place jobs can be sent to run.
///
/// Implementations must eventually run every accepted job exactly once, or
/// drop it with a log entry if the context has been closed.
pub trait Executor: Send + Sync + 'static {
    /// Submits a job.
    fn execute(&self, job: Job);

    /// Submits a job with a scheduling hint. Executors without priorities
    /// ignore the hint.
    fn execute_with_priority(&self, job: Job, priority: WorkPriority) {
        let _ = priority;
        self.execute(job);
    }

    /// Returns true if the calling thread is currently running this
    /// executor's jobs.
    fn is_current(&self) -> bool {
        false
    }

    /// Name used in logs.
    fn name(&self) -> &str;
}

/// Runs every job immediately on the submitting thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute(&self, job: Job) {
        job();
    }

    fn name(&self) -> &str {
        "inline"
    }
}

/// The executors backing the primary, secondary and worker lanes.
#[derive(Clone)]
pub struct ThreadContexts {
    primary: Arc<dyn Executor>,
    secondary: Arc<dyn Executor>,
    worker: Arc<dyn Executor>,
}

impl ThreadContexts {
    /// Bundles three executors.
    #[must_use]
    pub fn new(
        primary: Arc<dyn Executor>,
        secondary: Arc<dyn Executor>,
        worker: Arc<dyn Executor>,
    ) -> Self {
        Self {
            primary,
            secondary,
            worker,
        }
    }

    /// Every lane runs inline. Meant for headless tools and tests; late
    /// continuations on these lanes run on the attaching thread.
    #[must_use]
    pub fn inline() -> Self {
        let inline: Arc<dyn Executor> = Arc::new(InlineExecutor);
        Self::new(Arc::clone(&inline), Arc::clone(&inline), inline)
    }

    /// Returns the executor for a lane, or `None` for [`ThreadKind::Caller`].
    #[must_use]
    pub fn executor(&self, kind: ThreadKind) -> Option<&Arc<dyn Executor>> {
        match kind {
            ThreadKind::Caller => None,
            ThreadKind::Primary => Some(&self.primary),
            ThreadKind::Secondary => Some(&self.secondary),
            ThreadKind::Worker => Some(&self.worker),
        }
    }

    /// Sends a job to the lane. `Caller` runs it inline; `Worker` submits at
    /// [`WorkPriority::Low`].
    pub fn submit(&self, kind: ThreadKind, job: Job) {
        match kind {
            ThreadKind::Caller => job(),
            ThreadKind::Primary => self.primary.execute(job),
            ThreadKind::Secondary => self.secondary.execute(job),
            ThreadKind::Worker => self.worker.execute_with_priority(job, WorkPriority::Low),
        }
    }

    /// Returns true if the calling thread is running jobs for `kind`.
    ///
    /// `Caller` is always current.
    #[must_use]
    pub fn is_current(&self, kind: ThreadKind) -> bool {
        self.executor(kind).map_or(true, |exec| exec.is_current())
    }
}

impl fmt::Debug for ThreadContexts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadContexts")
            .field("primary", &self.primary.name())
            .field("secondary", &self.secondary.name())
            .field("worker", &self.worker.name())
            .finish()
    }
}
