//! The consumer half.

use super::promise::Promise;
use super::state::PromiseState;
use crate::dispatcher::{registry, DispatcherScope};
use crate::types::{DispatcherHandle, ThreadKind};
use std::fmt;
use std::sync::Arc;

/// Read-many view of a promised value.
///
/// Continuations can be attached at any time. Attached before the value
/// arrives, they fire in attachment order when it does. Attached afterwards,
/// they are dispatched asynchronously and never run on the attaching call
/// stack; a [`ThreadKind::Caller`] request is moved to the worker lane.
pub struct Future<T> {
    state: Arc<PromiseState<T>>,
}

impl<T> Future<T>
where
    T: Clone + Send + 'static,
{
    pub(crate) fn from_state(state: Arc<PromiseState<T>>) -> Self {
        Self { state }
    }

    pub(crate) fn state(&self) -> &Arc<PromiseState<T>> {
        &self.state
    }

    /// An already settled future owned by the current dispatcher.
    #[must_use]
    pub fn done(value: T) -> Self {
        Self::from_state(PromiseState::settled(&DispatcherScope::get(), value))
    }

    /// Returns true once the value is available.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.state.has_value()
    }

    /// Returns a copy of the value if it is available.
    #[must_use]
    pub fn try_get(&self) -> Option<T> {
        self.state.value()
    }

    /// Handle of the owning dispatcher.
    #[must_use]
    pub fn owner(&self) -> DispatcherHandle {
        self.state.owner()
    }

    /// Runs `f` with the value on `thread` once it is available.
    pub fn on_settled<F>(&self, thread: ThreadKind, f: F)
    where
        F: FnOnce(T) + Send + 'static,
    {
        self.state.attach(thread, Box::new(f));
    }

    /// Maps the value on `thread`, returning a future for the result.
    ///
    /// The chained promise belongs to this future's owner, or to the current
    /// dispatcher if the owner is gone.
    pub fn then<U, F>(&self, thread: ThreadKind, f: F) -> Future<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let promise = self.chained_promise();
        let setter = promise.clone();
        self.on_settled(thread, move |value| setter.set(f(value)));
        promise.future()
    }

    /// Like [`then`](Self::then) for continuations that themselves return a
    /// future; the result settles when that inner future does.
    pub fn then_future<U, F>(&self, thread: ThreadKind, f: F) -> Future<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Future<U> + Send + 'static,
    {
        let promise = self.chained_promise();
        let setter = promise.clone();
        self.on_settled(thread, move |value| setter.set_future(&f(value)));
        promise.future()
    }

    fn chained_promise<U>(&self) -> Promise<U>
    where
        U: Clone + Send + 'static,
    {
        let owner = registry()
            .resolve(self.state.owner())
            .unwrap_or_else(DispatcherScope::get);
        Promise::new_in(&owner)
    }
}

impl<T> Clone for Future<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> fmt::Debug for Future<T>
where
    T: Clone + Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Future")
            .field("owner", &self.owner())
            .field("settled", &self.is_settled())
            .finish()
    }
}
