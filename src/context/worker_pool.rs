//! Elastic OS-thread pool backing the worker lane.
//!
//! The pool manages a set of OS threads that run jobs in parallel with each
//! other and with every other lane. It supports:
//!
//! - **Capacity management**: configurable min/max threads with lazy scaling
//! - **Priorities**: a high and a low queue; high drains first
//! - **Shutdown**: graceful shutdown with a bounded drain timeout
//!
//! ## Thread Lifecycle
//!
//! Threads are spawned lazily up to `max_threads` when every running thread
//! is busy. Threads above `min_threads` retire after `idle_timeout` without
//! work. A job that panics ends its thread; the next submission spawns a
//! replacement.
//!
//! # Example
//!
//! ```ignore
//! use lanesync::context::WorkerPool;
//! use lanesync::config::WorkerPoolConfig;
//!
//! let pool = WorkerPool::new(WorkerPoolConfig::with_threads(1, 4));
//! let handle = pool.spawn(|| build_mesh());
//! handle.wait();
//! ```

use super::{Executor, Job};
use crate::config::WorkerPoolConfig;
use crate::tracing_compat::{error, trace, warn};
use crossbeam_queue::SegQueue;
use parking_lot::{Condvar, Mutex};
use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle as ThreadJoinHandle};
use std::time::{Duration, Instant};

const DROP_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT_POOL: Cell<u64> = const { Cell::new(0) };
}

/// Scheduling priority for pool jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WorkPriority {
    /// Drained before any low-priority job.
    High,
    /// Background work; the dispatcher's worker lane uses this.
    #[default]
    Low,
}

/// The worker pool. Dropping it shuts the threads down.
pub struct WorkerPool {
    inner: Arc<WorkerPoolInner>,
}

/// A cloneable submission handle that does not keep threads alive.
#[derive(Clone)]
pub struct WorkerPoolHandle {
    inner: Arc<WorkerPoolInner>,
}

struct WorkerPoolInner {
    id: u64,
    min_threads: usize,
    max_threads: usize,
    /// Threads currently alive.
    active_threads: AtomicUsize,
    /// Threads currently running a job.
    busy_threads: AtomicUsize,
    /// Jobs queued but not yet started.
    pending_count: AtomicUsize,
    next_thread_id: AtomicUsize,
    high: SegQueue<PoolTask>,
    low: SegQueue<PoolTask>,
    shutdown: AtomicBool,
    condvar: Condvar,
    mutex: Mutex<()>,
    idle_timeout: Duration,
    thread_name_prefix: String,
    thread_handles: Mutex<Vec<ThreadJoinHandle<()>>>,
}

struct PoolTask {
    work: Job,
    completion: Arc<TaskCompletion>,
}

struct TaskCompletion {
    done: Mutex<bool>,
    condvar: Condvar,
}

impl TaskCompletion {
    fn new() -> Self {
        Self {
            done: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    fn signal_done(&self) {
        *self.done.lock() = true;
        self.condvar.notify_all();
    }

    fn wait(&self) {
        let mut done = self.done.lock();
        while !*done {
            self.condvar.wait(&mut done);
        }
    }

    fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut done = self.done.lock();
        while !*done {
            if self.condvar.wait_until(&mut done, deadline).timed_out() {
                return *done;
            }
        }
        true
    }

    fn is_done(&self) -> bool {
        *self.done.lock()
    }
}

/// Completion handle for a job submitted with [`WorkerPool::spawn`].
///
/// A job that panics, or is dropped because the pool shut down, still counts
/// as done.
pub struct WorkerTaskHandle {
    completion: Arc<TaskCompletion>,
}

impl WorkerTaskHandle {
    /// Returns true once the job finished.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.completion.is_done()
    }

    /// Blocks until the job finished.
    pub fn wait(&self) {
        self.completion.wait();
    }

    /// Blocks until the job finished or the timeout elapsed. Returns true if
    /// the job finished.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.completion.wait_timeout(timeout)
    }
}

impl fmt::Debug for WorkerTaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerTaskHandle")
            .field("done", &self.is_done())
            .finish()
    }
}

impl WorkerPool {
    /// Creates a pool and eagerly spawns `min_threads` threads.
    #[must_use]
    pub fn new(mut config: WorkerPoolConfig) -> Self {
        config.normalize();
        let inner = Arc::new(WorkerPoolInner {
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            min_threads: config.min_threads,
            max_threads: config.max_threads,
            active_threads: AtomicUsize::new(0),
            busy_threads: AtomicUsize::new(0),
            pending_count: AtomicUsize::new(0),
            next_thread_id: AtomicUsize::new(0),
            high: SegQueue::new(),
            low: SegQueue::new(),
            shutdown: AtomicBool::new(false),
            condvar: Condvar::new(),
            mutex: Mutex::new(()),
            idle_timeout: config.idle_timeout,
            thread_name_prefix: config.thread_name_prefix,
            thread_handles: Mutex::new(Vec::with_capacity(config.max_threads)),
        });

        for _ in 0..inner.min_threads {
            spawn_thread_on_inner(&inner);
        }

        Self { inner }
    }

    /// Returns a submission handle.
    #[must_use]
    pub fn handle(&self) -> WorkerPoolHandle {
        WorkerPoolHandle {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Submits a job at [`WorkPriority::Low`].
    pub fn spawn<F>(&self, f: F) -> WorkerTaskHandle
    where
        F: FnOnce() + Send + 'static,
    {
        submit(&self.inner, Box::new(f), WorkPriority::Low)
    }

    /// Submits a job at the given priority.
    pub fn spawn_with_priority<F>(&self, f: F, priority: WorkPriority) -> WorkerTaskHandle
    where
        F: FnOnce() + Send + 'static,
    {
        submit(&self.inner, Box::new(f), priority)
    }

    /// Jobs queued but not yet started.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.pending_count.load(Ordering::Relaxed)
    }

    /// Threads currently alive.
    #[must_use]
    pub fn active_threads(&self) -> usize {
        self.inner.active_threads.load(Ordering::Relaxed)
    }

    /// Threads currently running a job.
    #[must_use]
    pub fn busy_threads(&self) -> usize {
        self.inner.busy_threads.load(Ordering::Relaxed)
    }

    /// Returns true once shutdown was requested.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.inner.shutdown.load(Ordering::Acquire)
    }

    /// Returns true if the calling thread belongs to this pool.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.inner.is_current()
    }

    /// Requests shutdown. Queued jobs still run; new jobs are rejected.
    pub fn shutdown(&self) {
        self.inner.shutdown.store(true, Ordering::Release);
        self.inner.notify_all();
    }

    /// Requests shutdown and waits for every thread to exit.
    ///
    /// Returns false if threads were still running when the timeout elapsed.
    pub fn shutdown_and_wait(&self, timeout: Duration) -> bool {
        self.shutdown();

        let deadline = Instant::now() + timeout;
        while self.inner.active_threads.load(Ordering::Acquire) > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            self.inner.notify_all();
            thread::sleep(Duration::from_millis(10).min(remaining));
        }

        let handles: Vec<_> = self.inner.thread_handles.lock().drain(..).collect();
        for handle in handles {
            let _ = handle.join();
        }
        true
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if self.inner.is_current() {
            // A worker cannot wait for itself to exit.
            self.shutdown();
            return;
        }
        if !self.shutdown_and_wait(DROP_SHUTDOWN_TIMEOUT) {
            warn!(
                pool = %self.inner.thread_name_prefix,
                active = self.inner.active_threads.load(Ordering::Relaxed),
                "worker pool threads still running after shutdown timeout"
            );
        }
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("min_threads", &self.inner.min_threads)
            .field("max_threads", &self.inner.max_threads)
            .field("active_threads", &self.active_threads())
            .field("pending_tasks", &self.pending_count())
            .finish()
    }
}

impl WorkerPoolHandle {
    /// Submits a job at the given priority.
    pub fn spawn_with_priority<F>(&self, f: F, priority: WorkPriority) -> WorkerTaskHandle
    where
        F: FnOnce() + Send + 'static,
    {
        submit(&self.inner, Box::new(f), priority)
    }

    /// Returns true once the owning pool requested shutdown.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.inner.shutdown.load(Ordering::Acquire)
    }
}

impl fmt::Debug for WorkerPoolHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPoolHandle")
            .field(
                "active_threads",
                &self.inner.active_threads.load(Ordering::Relaxed),
            )
            .field(
                "pending_tasks",
                &self.inner.pending_count.load(Ordering::Relaxed),
            )
            .finish()
    }
}

impl Executor for WorkerPoolHandle {
    fn execute(&self, job: Job) {
        submit(&self.inner, job, WorkPriority::Low);
    }

    fn execute_with_priority(&self, job: Job, priority: WorkPriority) {
        submit(&self.inner, job, priority);
    }

    fn is_current(&self) -> bool {
        self.inner.is_current()
    }

    fn name(&self) -> &str {
        &self.inner.thread_name_prefix
    }
}

impl WorkerPoolInner {
    fn is_current(&self) -> bool {
        CURRENT_POOL.with(Cell::get) == self.id
    }

    fn notify_all(&self) {
        let _guard = self.mutex.lock();
        self.condvar.notify_all();
    }

    fn pop(&self) -> Option<PoolTask> {
        self.high.pop().or_else(|| self.low.pop())
    }

    fn has_work(&self) -> bool {
        !self.high.is_empty() || !self.low.is_empty()
    }
}

fn submit(inner: &Arc<WorkerPoolInner>, work: Job, priority: WorkPriority) -> WorkerTaskHandle {
    let completion = Arc::new(TaskCompletion::new());
    let handle = WorkerTaskHandle {
        completion: Arc::clone(&completion),
    };

    if inner.shutdown.load(Ordering::Acquire) {
        warn!(pool = %inner.thread_name_prefix, "worker pool shut down, dropping job");
        completion.signal_done();
        return handle;
    }

    let task = PoolTask { work, completion };
    match priority {
        WorkPriority::High => inner.high.push(task),
        WorkPriority::Low => inner.low.push(task),
    }
    inner.pending_count.fetch_add(1, Ordering::Relaxed);

    {
        // Serialized with idle retirement so a queued job never strands.
        let _guard = inner.mutex.lock();
        maybe_spawn_thread_on_inner(inner);
        inner.condvar.notify_one();
    }
    handle
}

fn spawn_thread_on_inner(inner: &Arc<WorkerPoolInner>) {
    let inner_clone = Arc::clone(inner);
    inner.active_threads.fetch_add(1, Ordering::Relaxed);
    let seq = inner.next_thread_id.fetch_add(1, Ordering::Relaxed);
    let name = format!("{}-{seq}", inner.thread_name_prefix);

    let spawned = thread::Builder::new().name(name).spawn(move || {
        let mut alive = ThreadAliveGuard {
            inner: &inner_clone,
            counted: true,
        };
        CURRENT_POOL.with(|id| id.set(inner_clone.id));
        trace!(pool = %inner_clone.thread_name_prefix, "worker thread started");
        worker_loop(&inner_clone, &mut alive);
        trace!(pool = %inner_clone.thread_name_prefix, "worker thread retired");
    });

    match spawned {
        Ok(handle) => inner.thread_handles.lock().push(handle),
        Err(err) => {
            inner.active_threads.fetch_sub(1, Ordering::Relaxed);
            error!(pool = %inner.thread_name_prefix, "failed to spawn worker thread: {err}");
        }
    }
}

fn maybe_spawn_thread_on_inner(inner: &Arc<WorkerPoolInner>) {
    let active = inner.active_threads.load(Ordering::Relaxed);
    let busy = inner.busy_threads.load(Ordering::Relaxed);
    let pending = inner.pending_count.load(Ordering::Relaxed);

    if active < inner.max_threads && busy >= active && pending > 0 {
        spawn_thread_on_inner(inner);
    }
}

fn worker_loop(inner: &Arc<WorkerPoolInner>, alive: &mut ThreadAliveGuard<'_>) {
    loop {
        if let Some(task) = inner.pop() {
            inner.pending_count.fetch_sub(1, Ordering::Relaxed);
            let _busy = BusyGuard::enter(inner, &task.completion, alive);
            (task.work)();
            continue;
        }

        if inner.shutdown.load(Ordering::Acquire) {
            break;
        }

        let mut guard = inner.mutex.lock();
        if inner.has_work() || inner.shutdown.load(Ordering::Acquire) {
            continue;
        }
        if inner.active_threads.load(Ordering::Relaxed) > inner.min_threads {
            let timed_out = inner
                .condvar
                .wait_for(&mut guard, inner.idle_timeout)
                .timed_out();
            if timed_out
                && !inner.has_work()
                && inner.active_threads.load(Ordering::Relaxed) > inner.min_threads
            {
                alive.release();
                break;
            }
        } else {
            inner.condvar.wait(&mut guard);
        }
    }
}

/// Keeps the pool counters and the completion signal right even if the job
/// panics.
struct BusyGuard<'a, 'b> {
    inner: &'a Arc<WorkerPoolInner>,
    completion: &'a TaskCompletion,
    alive: &'a mut ThreadAliveGuard<'b>,
}

impl<'a, 'b> BusyGuard<'a, 'b> {
    fn enter(
        inner: &'a Arc<WorkerPoolInner>,
        completion: &'a TaskCompletion,
        alive: &'a mut ThreadAliveGuard<'b>,
    ) -> Self {
        inner.busy_threads.fetch_add(1, Ordering::Relaxed);
        Self {
            inner,
            completion,
            alive,
        }
    }
}

impl Drop for BusyGuard<'_, '_> {
    fn drop(&mut self) {
        if thread::panicking() {
            // This thread is unwinding out of the pool; hand queued work to a
            // replacement.
            let _guard = self.inner.mutex.lock();
            self.alive.release();
            self.inner.busy_threads.fetch_sub(1, Ordering::Relaxed);
            maybe_spawn_thread_on_inner(self.inner);
        } else {
            self.inner.busy_threads.fetch_sub(1, Ordering::Relaxed);
        }
        self.completion.signal_done();
    }
}

struct ThreadAliveGuard<'a> {
    inner: &'a WorkerPoolInner,
    counted: bool,
}

impl ThreadAliveGuard<'_> {
    fn release(&mut self) {
        if std::mem::take(&mut self.counted) {
            self.inner.active_threads.fetch_sub(1, Ordering::Release);
        }
    }
}

impl Drop for ThreadAliveGuard<'_> {
    fn drop(&mut self) {
        CURRENT_POOL.with(|id| id.set(0));
        self.release();
    }
}
