//! The shared cell behind a promise/future pair.

use crate::dispatcher::{global, registry, TaskDispatcher};
use crate::types::{DispatcherHandle, ThreadKind};
use crate::util::SlotKey;
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::mem;
use std::sync::Arc;

type Callback<T> = Box<dyn FnOnce(T) + Send + 'static>;

pub(crate) enum Continuation<T> {
    /// Dispatched through the owner onto a lane.
    Dispatch {
        thread: ThreadKind,
        callback: Callback<T>,
    },
    /// Run on whichever thread settles the state. Internal plumbing only
    /// (forwarding, wakers); never user callbacks.
    Direct(Callback<T>),
}

enum Phase<T> {
    Pending,
    /// Claimed by a foreign future; only the forward may settle it.
    Forwarding,
    /// Value recorded, continuations being drained.
    Firing(T),
    Settled(T),
}

struct Inner<T> {
    phase: Phase<T>,
    continuations: SmallVec<[Continuation<T>; 1]>,
    tracked: Option<SlotKey>,
}

pub(crate) struct PromiseState<T> {
    owner: DispatcherHandle,
    inner: Mutex<Inner<T>>,
}

impl<T> PromiseState<T>
where
    T: Clone + Send + 'static,
{
    /// Creates a pending state tracked by `owner`.
    pub(crate) fn pending(owner: &TaskDispatcher) -> Arc<Self> {
        let state = Arc::new(Self {
            owner: owner.handle(),
            inner: Mutex::new(Inner {
                phase: Phase::Pending,
                continuations: SmallVec::new(),
                tracked: None,
            }),
        });
        let tracked = owner.track_promise(state.clone(), std::any::type_name::<T>());
        state.inner.lock().tracked = tracked;
        state
    }

    /// Creates an already settled, untracked state.
    pub(crate) fn settled(owner: &TaskDispatcher, value: T) -> Arc<Self> {
        Arc::new(Self {
            owner: owner.handle(),
            inner: Mutex::new(Inner {
                phase: Phase::Settled(value),
                continuations: SmallVec::new(),
                tracked: None,
            }),
        })
    }

    pub(crate) fn owner(&self) -> DispatcherHandle {
        self.owner
    }

    /// The owner if it is still alive, else the global dispatcher.
    pub(crate) fn dispatcher(&self) -> TaskDispatcher {
        registry()
            .resolve(self.owner)
            .unwrap_or_else(global::global)
    }

    pub(crate) fn value(&self) -> Option<T> {
        match &self.inner.lock().phase {
            Phase::Firing(value) | Phase::Settled(value) => Some(value.clone()),
            Phase::Pending | Phase::Forwarding => None,
        }
    }

    pub(crate) fn has_value(&self) -> bool {
        matches!(
            self.inner.lock().phase,
            Phase::Firing(_) | Phase::Settled(_)
        )
    }

    /// Claims a pending state for forwarding. Fails if it was already
    /// claimed or settled.
    pub(crate) fn claim_for_forward(&self) -> bool {
        let mut inner = self.inner.lock();
        if matches!(inner.phase, Phase::Pending) {
            inner.phase = Phase::Forwarding;
            true
        } else {
            false
        }
    }

    /// Records the value and fires every continuation. Hands the value back
    /// if the state cannot be settled this way.
    pub(crate) fn settle(self: &Arc<Self>, value: T, forwarded: bool) -> Result<(), T> {
        let tracked = {
            let mut inner = self.inner.lock();
            match inner.phase {
                Phase::Pending => {}
                Phase::Forwarding if forwarded => {}
                _ => return Err(value),
            }
            inner.phase = Phase::Firing(value.clone());
            inner.tracked.take()
        };

        let dispatcher = self.dispatcher();
        if let Some(key) = tracked {
            // A dead owner has already released its table.
            if dispatcher.handle() == self.owner {
                dispatcher.untrack_promise(key);
            }
        }
        self.fire(&dispatcher, &value);
        Ok(())
    }

    fn fire(&self, dispatcher: &TaskDispatcher, value: &T) {
        loop {
            let batch = {
                let mut inner = self.inner.lock();
                if inner.continuations.is_empty() {
                    if let Phase::Firing(v) = mem::replace(&mut inner.phase, Phase::Pending) {
                        inner.phase = Phase::Settled(v);
                    }
                    return;
                }
                mem::take(&mut inner.continuations)
            };
            for continuation in batch {
                run(dispatcher, continuation, value.clone());
            }
        }
    }

    /// Attaches a continuation for `thread`.
    ///
    /// Once the value is available, the continuation is dispatched on
    /// [`ThreadKind::deferred`] so it never runs on the attaching stack.
    pub(crate) fn attach(&self, thread: ThreadKind, callback: Callback<T>) {
        let mut inner = self.inner.lock();
        match &inner.phase {
            Phase::Pending | Phase::Forwarding => {
                inner
                    .continuations
                    .push(Continuation::Dispatch { thread, callback });
            }
            Phase::Firing(_) => {
                inner.continuations.push(Continuation::Dispatch {
                    thread: thread.deferred(),
                    callback,
                });
            }
            Phase::Settled(value) => {
                let value = value.clone();
                drop(inner);
                self.dispatcher()
                    .dispatch(thread.deferred(), move || callback(value));
            }
        }
    }

    /// Attaches internal plumbing that runs wherever the value lands,
    /// immediately if it already has.
    pub(crate) fn attach_direct(&self, callback: Callback<T>) {
        let mut inner = self.inner.lock();
        match &inner.phase {
            Phase::Settled(value) => {
                let value = value.clone();
                drop(inner);
                callback(value);
            }
            _ => inner.continuations.push(Continuation::Direct(callback)),
        }
    }
}

fn run<T>(dispatcher: &TaskDispatcher, continuation: Continuation<T>, value: T)
where
    T: Send + 'static,
{
    match continuation {
        Continuation::Dispatch { thread, callback } => {
            dispatcher.dispatch(thread, move || callback(value));
        }
        Continuation::Direct(callback) => callback(value),
    }
}
