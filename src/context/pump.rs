//! Externally drained serial queue.

use super::{Executor, Job};
use crate::error::{Error, ErrorKind};
use crate::tracing_compat::{trace, warn};
use crossbeam_queue::SegQueue;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, ThreadId};

/// A FIFO of jobs run by whoever calls [`pump`](Self::pump).
///
/// Jobs submitted from any thread are queued; they only run when the owning
/// loop drains the queue. At most one thread drains at a time, so jobs on a
/// pump are serialized with respect to each other. A pump issued from inside
/// a job of the same queue returns without running anything.
pub struct PumpQueue {
    name: String,
    queue: SegQueue<Job>,
    drain_lock: Mutex<()>,
    drainer: Mutex<Option<ThreadId>>,
    closed: AtomicBool,
}

impl PumpQueue {
    /// Creates an empty, open queue.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            queue: SegQueue::new(),
            drain_lock: Mutex::new(()),
            drainer: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Queues a job, failing if the queue has been closed.
    pub fn try_execute(&self, job: Job) -> Result<(), Error> {
        if self.is_closed() {
            return Err(Error::new(ErrorKind::ContextClosed)
                .with_message(format!("pump queue {:?} is closed", self.name)));
        }
        self.queue.push(job);
        Ok(())
    }

    /// Runs the jobs that were queued when the call started.
    ///
    /// Jobs queued while pumping wait for the next call. Returns the number
    /// of jobs run, or 0 if another drain is in progress.
    pub fn pump(&self) -> usize {
        let batch = self.queue.len();
        self.drain(batch)
    }

    /// Runs jobs until the queue is empty, including jobs queued by jobs.
    pub fn pump_all(&self) -> usize {
        self.drain(usize::MAX)
    }

    fn drain(&self, limit: usize) -> usize {
        let Some(_drain) = self.drain_lock.try_lock() else {
            trace!(queue = %self.name, "pump skipped, already draining");
            return 0;
        };
        let _drainer = DrainerGuard::enter(self);

        let mut ran = 0;
        while ran < limit {
            let Some(job) = self.queue.pop() else {
                break;
            };
            job();
            ran += 1;
        }
        if ran > 0 {
            trace!(queue = %self.name, ran, "pump drained");
        }
        ran
    }

    /// Stops accepting jobs. Already queued jobs can still be pumped.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Returns true once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of queued jobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns true if no jobs are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns true if the calling thread is draining this queue.
    #[must_use]
    pub fn is_current(&self) -> bool {
        *self.drainer.lock() == Some(thread::current().id())
    }
}

struct DrainerGuard<'a> {
    queue: &'a PumpQueue,
}

impl<'a> DrainerGuard<'a> {
    fn enter(queue: &'a PumpQueue) -> Self {
        *queue.drainer.lock() = Some(thread::current().id());
        Self { queue }
    }
}

impl Drop for DrainerGuard<'_> {
    fn drop(&mut self) {
        *self.queue.drainer.lock() = None;
    }
}

impl Executor for PumpQueue {
    fn execute(&self, job: Job) {
        if let Err(err) = self.try_execute(job) {
            warn!(queue = %self.name, "dropping job: {err}");
        }
    }

    fn is_current(&self) -> bool {
        PumpQueue::is_current(self)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for PumpQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PumpQueue")
            .field("name", &self.name)
            .field("len", &self.queue.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
