//! Value-scoped dispatcher ownership.

use super::diagnostics::PromiseDump;
use super::task_dispatcher::TaskDispatcher;
use std::fmt;
use std::ops::Deref;

/// Owns a [`TaskDispatcher`] for the lifetime of a subsystem.
///
/// Dropping the owner tears the dispatcher down: it stops resolving through
/// the registry, releases its pending promises and reports them according to
/// its [`LeakResponse`](crate::config::LeakResponse). Clones of the inner
/// `TaskDispatcher` may outlive the owner; they keep dispatching but report
/// `is_exiting() == true`.
pub struct ScopedDispatcher {
    dispatcher: TaskDispatcher,
}

impl ScopedDispatcher {
    pub(crate) fn new(dispatcher: TaskDispatcher) -> Self {
        Self { dispatcher }
    }

    /// Announces shutdown so that `is_exiting()` turns true before teardown.
    pub fn begin_shutdown(&self) {
        self.dispatcher.inner().begin_shutdown();
    }

    /// Tears the dispatcher down and returns what was still pending.
    #[must_use = "the returned dumps are the leaked promises"]
    pub fn shutdown(self) -> Vec<PromiseDump> {
        self.dispatcher.inner().teardown()
    }

    /// Returns a shared reference to the owned dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> TaskDispatcher {
        self.dispatcher.clone()
    }
}

impl Deref for ScopedDispatcher {
    type Target = TaskDispatcher;

    fn deref(&self) -> &TaskDispatcher {
        &self.dispatcher
    }
}

impl Drop for ScopedDispatcher {
    fn drop(&mut self) {
        let _ = self.dispatcher.inner().teardown();
    }
}

impl fmt::Debug for ScopedDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ScopedDispatcher")
            .field(&self.dispatcher)
            .finish()
    }
}
