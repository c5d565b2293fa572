//! The producer half.

use super::future::Future;
use super::state::PromiseState;
use crate::dispatcher::{DispatcherScope, TaskDispatcher};
use crate::error::{report_usage_error, Error, ErrorKind, SetError};
use crate::types::DispatcherHandle;
use std::fmt;
use std::sync::Arc;

/// Write-once producer of a value.
///
/// The promise is owned by a dispatcher, which tracks it until it is settled.
/// A promise dropped without being set stays pending and is reported when its
/// dispatcher is torn down.
pub struct Promise<T> {
    state: Arc<PromiseState<T>>,
}

impl<T> Promise<T>
where
    T: Clone + Send + 'static,
{
    /// Creates a promise owned by the current dispatcher
    /// (see [`DispatcherScope::get`]).
    #[must_use]
    pub fn new() -> Self {
        Self::new_in(&DispatcherScope::get())
    }

    /// Creates a promise owned by `dispatcher`.
    #[must_use]
    pub fn new_in(dispatcher: &TaskDispatcher) -> Self {
        Self {
            state: PromiseState::pending(dispatcher),
        }
    }

    /// Returns a future reading this promise.
    #[must_use]
    pub fn future(&self) -> Future<T> {
        Future::from_state(Arc::clone(&self.state))
    }

    /// Settles the promise. Setting twice is a usage error.
    pub fn set(&self, value: T) {
        if self.try_set(value).is_err() {
            report_usage_error(&Error::new(ErrorKind::PromiseAlreadySet).with_message(format!(
                "Promise<{}> set twice",
                std::any::type_name::<T>()
            )));
        }
    }

    /// Settles the promise, handing the value back if it was already set.
    pub fn try_set(&self, value: T) -> Result<(), SetError<T>> {
        self.state.settle(value, false).map_err(SetError)
    }

    /// Settles the promise with whatever `future` settles with.
    ///
    /// Claiming an already set or forwarded promise is a usage error.
    pub fn set_future(&self, future: &Future<T>) {
        if self.try_set_future(future).is_err() {
            report_usage_error(&Error::new(ErrorKind::PromiseAlreadySet).with_message(format!(
                "Promise<{}> forwarded after being set",
                std::any::type_name::<T>()
            )));
        }
    }

    /// Like [`set_future`](Self::set_future), handing the future back if the
    /// promise was already set or forwarded.
    pub fn try_set_future(&self, future: &Future<T>) -> Result<(), SetError<Future<T>>> {
        if !self.state.claim_for_forward() {
            return Err(SetError(future.clone()));
        }
        let target = Arc::clone(&self.state);
        future.state().attach_direct(Box::new(move |value| {
            // The claim above makes this the only writer.
            let _ = target.settle(value, true);
        }));
        Ok(())
    }

    /// Returns true once the value has been written.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.state.has_value()
    }

    /// Handle of the owning dispatcher.
    #[must_use]
    pub fn owner(&self) -> DispatcherHandle {
        self.state.owner()
    }
}

impl<T> Default for Promise<T>
where
    T: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> fmt::Debug for Promise<T>
where
    T: Clone + Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("owner", &self.owner())
            .field("is_set", &self.is_set())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ThreadContexts;
    use crate::dispatcher::DispatcherBuilder;

    fn dispatcher() -> crate::dispatcher::ScopedDispatcher {
        DispatcherBuilder::new()
            .name("promise")
            .contexts(ThreadContexts::inline())
            .build_scoped()
            .unwrap()
    }

    #[test]
    fn new_uses_current_scope() {
        let dispatcher = dispatcher();
        let _scope = DispatcherScope::enter(&dispatcher);
        let promise = Promise::<u8>::new();
        assert_eq!(promise.owner(), dispatcher.handle());
        assert_eq!(dispatcher.num_promises(), 1);
        promise.set(1);
        assert_eq!(dispatcher.num_promises(), 0);
    }

    #[test]
    fn try_set_returns_rejected_value() {
        let dispatcher = dispatcher();
        let promise = Promise::new_in(&dispatcher);
        assert!(promise.try_set(String::from("a")).is_ok());
        let err = promise.try_set(String::from("b")).unwrap_err();
        assert_eq!(err.into_inner(), "b");
        assert_eq!(promise.future().try_get().as_deref(), Some("a"));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "promise already set")]
    fn set_twice_is_a_usage_error() {
        let dispatcher = dispatcher();
        let promise = Promise::new_in(&dispatcher);
        promise.set(1_u8);
        promise.set(2_u8);
    }

    #[test]
    fn forwarded_promise_rejects_direct_set() {
        let dispatcher = dispatcher();
        let source = Promise::<u8>::new_in(&dispatcher);
        let target = Promise::<u8>::new_in(&dispatcher);
        target.set_future(&source.future());
        assert!(target.try_set(5).is_err());
        assert!(target.try_set_future(&source.future()).is_err());

        source.set(7);
        assert_eq!(target.future().try_get(), Some(7));
        assert_eq!(dispatcher.num_promises(), 0);
    }
}
