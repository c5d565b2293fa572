//! The dispatcher itself.

use super::diagnostics::{report_leaks, PromiseDump, PromiseTracker};
use super::registry::registry;
use super::scope::DispatcherScope;
use crate::config::{DispatcherConfig, LeakResponse};
use crate::context::ThreadContexts;
use crate::promise::{Future, Promise};
use crate::tracing_compat::{debug, warn};
use crate::types::{DispatcherHandle, ThreadKind};
use crate::util::SlotKey;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Lifetime class of a dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatcherKind {
    /// The process-wide dispatcher; never reports itself as exiting.
    Global,
    /// Owned by a [`ScopedDispatcher`](super::ScopedDispatcher).
    Scoped,
}

pub(crate) struct DispatcherInner {
    name: String,
    kind: DispatcherKind,
    handle: DispatcherHandle,
    contexts: ThreadContexts,
    tracker: PromiseTracker,
    leak_response: LeakResponse,
    exiting: AtomicBool,
    torn_down: AtomicBool,
}

impl DispatcherInner {
    pub(crate) fn begin_shutdown(&self) {
        if !self.exiting.swap(true, Ordering::AcqRel) {
            debug!(dispatcher = %self.name, "dispatcher shutting down");
        }
    }

    /// Unregisters, releases tracked promises and reports leaks. Runs once.
    pub(crate) fn teardown(&self) -> Vec<PromiseDump> {
        if self.torn_down.swap(true, Ordering::AcqRel) {
            return Vec::new();
        }
        if self.kind == DispatcherKind::Scoped {
            self.exiting.store(true, Ordering::Release);
        }
        registry().release(self.handle);
        let leaked = self.tracker.release_all(&self.name);
        debug!(
            dispatcher = %self.name,
            leaked = leaked.len(),
            "dispatcher torn down"
        );
        report_leaks(&self.name, &leaked, self.leak_response);
        leaked
    }
}

impl Drop for DispatcherInner {
    fn drop(&mut self) {
        if !self.torn_down.load(Ordering::Acquire) {
            registry().release(self.handle);
        }
    }
}

/// An execution context that runs callables on logical lanes and owns the
/// bookkeeping for the promises created under it.
///
/// Cloning is cheap and yields another reference to the same dispatcher.
#[derive(Clone)]
pub struct TaskDispatcher {
    inner: Arc<DispatcherInner>,
}

impl TaskDispatcher {
    pub(crate) fn create(
        config: DispatcherConfig,
        kind: DispatcherKind,
        contexts: ThreadContexts,
    ) -> Self {
        let inner = Arc::new_cyclic(|weak| {
            let handle = registry().register(weak.clone());
            DispatcherInner {
                name: config.name,
                kind,
                handle,
                contexts,
                tracker: PromiseTracker::new(config.track_promise_backtraces),
                leak_response: config.leak_response,
                exiting: AtomicBool::new(false),
                torn_down: AtomicBool::new(false),
            }
        });
        debug!(
            dispatcher = %inner.name,
            kind = ?kind,
            handle = ?inner.handle,
            "dispatcher created"
        );
        Self { inner }
    }

    pub(crate) fn from_inner(inner: Arc<DispatcherInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn inner(&self) -> &DispatcherInner {
        &self.inner
    }

    /// Runs `f` on the given lane, with this dispatcher as the current one.
    ///
    /// `Caller` runs inline before returning; every other lane hands the
    /// callable to its executor. Panics from `f` are not caught.
    pub fn dispatch<F>(&self, thread: ThreadKind, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let this = self.clone();
        let job = move || {
            let _scope = DispatcherScope::enter(&this);
            f();
        };
        if thread.is_inline() {
            job();
        } else {
            self.inner.contexts.submit(thread, Box::new(job));
        }
    }

    /// Returns true once shutdown has begun. Always false for the global
    /// dispatcher.
    #[must_use]
    pub fn is_exiting(&self) -> bool {
        self.inner.kind == DispatcherKind::Scoped && self.inner.exiting.load(Ordering::Acquire)
    }

    /// Number of promises owned by this dispatcher that are still pending.
    #[must_use]
    pub fn num_promises(&self) -> i32 {
        self.inner.tracker.count()
    }

    /// Snapshot of every pending promise, each also logged at `warn`.
    ///
    /// Teardown drains the table, so after it this returns an empty list even
    /// on a surviving clone. The promises pending at teardown are reported by
    /// [`ScopedDispatcher::shutdown`](super::ScopedDispatcher::shutdown) and
    /// the teardown log.
    #[must_use]
    pub fn dump_promises(&self) -> Vec<PromiseDump> {
        let dumps = self.inner.tracker.dump(&self.inner.name);
        for dump in &dumps {
            warn!(dispatcher = %self.inner.name, "pending {dump}");
        }
        dumps
    }

    /// Returns a future owned by this dispatcher that settles with the value
    /// of `future`.
    pub fn wrap<T>(&self, future: &Future<T>) -> Future<T>
    where
        T: Clone + Send + 'static,
    {
        let promise = Promise::new_in(self);
        promise.set_future(future);
        promise.future()
    }

    /// This dispatcher's registry handle.
    #[must_use]
    pub fn handle(&self) -> DispatcherHandle {
        self.inner.handle
    }

    /// Name used in logs and promise dumps.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Global or scoped.
    #[must_use]
    pub fn kind(&self) -> DispatcherKind {
        self.inner.kind
    }

    /// The executors behind this dispatcher's lanes.
    #[must_use]
    pub fn contexts(&self) -> &ThreadContexts {
        &self.inner.contexts
    }

    /// Returns true if both values refer to the same dispatcher.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn track_promise(
        &self,
        state: Arc<dyn Any + Send + Sync>,
        type_name: &'static str,
    ) -> Option<SlotKey> {
        self.inner.tracker.track(state, type_name)
    }

    pub(crate) fn untrack_promise(&self, key: SlotKey) {
        self.inner.tracker.untrack(key);
    }
}

impl fmt::Debug for TaskDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDispatcher")
            .field("name", &self.inner.name)
            .field("kind", &self.inner.kind)
            .field("handle", &self.inner.handle)
            .field("num_promises", &self.num_promises())
            .finish()
    }
}
