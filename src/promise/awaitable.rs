//! `.await` support for [`Future`].

use super::future::Future;
use parking_lot::Mutex;
use std::future::IntoFuture;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

struct Slot<T> {
    value: Option<T>,
    waker: Option<Waker>,
}

/// A [`std::future::Future`] that resolves with the promised value.
///
/// Created by `.await`ing (or calling `into_future` on) a [`Future`]. The
/// value is delivered on the thread that settles the promise, which only
/// wakes the task; the awaiting task then resumes on its own executor.
pub struct Awaited<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T> Awaited<T>
where
    T: Clone + Send + 'static,
{
    fn new(future: &Future<T>) -> Self {
        let slot = Arc::new(Mutex::new(Slot {
            value: None,
            waker: None,
        }));
        let writer = Arc::clone(&slot);
        future.state().attach_direct(Box::new(move |value| {
            let waker = {
                let mut slot = writer.lock();
                slot.value = Some(value);
                slot.waker.take()
            };
            if let Some(waker) = waker {
                waker.wake();
            }
        }));
        Self { slot }
    }
}

impl<T> std::future::Future for Awaited<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let mut slot = self.slot.lock();
        if let Some(value) = slot.value.take() {
            return Poll::Ready(value);
        }
        match &slot.waker {
            Some(waker) if waker.will_wake(cx.waker()) => {}
            _ => slot.waker = Some(cx.waker().clone()),
        }
        Poll::Pending
    }
}

impl<T> IntoFuture for Future<T>
where
    T: Clone + Send + 'static,
{
    type Output = T;
    type IntoFuture = Awaited<T>;

    fn into_future(self) -> Awaited<T> {
        Awaited::new(&self)
    }
}
