//! Thread-local "current dispatcher".
//!
//! Code running under [`TaskDispatcher::dispatch`] sees that dispatcher as
//! current, so promises it creates are attributed to it without passing the
//! dispatcher around. Scopes nest: entering saves the previous value and
//! dropping the scope restores it.

use super::global;
use super::task_dispatcher::TaskDispatcher;
use crate::error::{report_usage_error, Error, ErrorKind};
use crate::promise::Future;
use std::cell::RefCell;
use std::marker::PhantomData;

thread_local! {
    static CURRENT_DISPATCHER: RefCell<Option<TaskDispatcher>> = const { RefCell::new(None) };
}

/// Guard that makes a dispatcher current until dropped.
///
/// The guard is bound to the thread that created it. Scopes must be dropped
/// in reverse order of creation; anything else is a usage error.
#[must_use = "the dispatcher is only current while the scope is alive"]
pub struct DispatcherScope {
    installed: TaskDispatcher,
    prev: Option<TaskDispatcher>,
    _not_send: PhantomData<*const ()>,
}

impl DispatcherScope {
    /// Makes `dispatcher` current on this thread.
    pub fn enter(dispatcher: &TaskDispatcher) -> Self {
        let prev = CURRENT_DISPATCHER.with(|slot| slot.borrow_mut().replace(dispatcher.clone()));
        Self {
            installed: dispatcher.clone(),
            prev,
            _not_send: PhantomData,
        }
    }

    /// Returns the current dispatcher, if a scope is active on this thread.
    #[must_use]
    pub fn current() -> Option<TaskDispatcher> {
        CURRENT_DISPATCHER.with(|slot| slot.borrow().clone())
    }

    /// Returns the current dispatcher, falling back to the global one.
    #[must_use]
    pub fn get() -> TaskDispatcher {
        Self::current().unwrap_or_else(global::global)
    }

    /// Runs `f` with the global dispatcher current, then wraps its result
    /// into the dispatcher that was current at the call site.
    pub fn call_in_global_scope<T, F>(f: F) -> Future<T>
    where
        T: Clone + Send + 'static,
        F: FnOnce() -> Future<T>,
    {
        let caller = Self::get();
        let future = {
            let _scope = Self::enter(&global::global());
            f()
        };
        caller.wrap(&future)
    }

    /// The dispatcher this scope installed.
    #[must_use]
    pub fn dispatcher(&self) -> &TaskDispatcher {
        &self.installed
    }
}

impl Drop for DispatcherScope {
    fn drop(&mut self) {
        let prev = self.prev.take();
        let balanced = CURRENT_DISPATCHER.with(|slot| {
            let mut current = slot.borrow_mut();
            let balanced = current
                .as_ref()
                .is_some_and(|d| d.ptr_eq(&self.installed));
            *current = prev;
            balanced
        });
        if !balanced {
            report_usage_error(&Error::new(ErrorKind::ScopeMismatch).with_message(format!(
                "scope for dispatcher {:?} exited while another was current",
                self.installed.name()
            )));
        }
    }
}
