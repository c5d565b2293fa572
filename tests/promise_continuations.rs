//! Continuation delivery: ordering, lanes, and post-settlement attaches.

#[macro_use]
mod common;

use common::*;
use lanesync::{DispatcherKind, DispatcherScope, LeakResponse, Promise, ThreadKind};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

#[test]
fn set_42_is_seen_once_on_primary() {
    init_test_logging();
    test_phase!("set_42_is_seen_once_on_primary");
    let lanes = Lanes::new();
    let dispatcher = lanes.dispatcher("primary-delivery");

    let promise = Promise::<i32>::new_in(&dispatcher);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let (seen_clone, primary) = (Arc::clone(&seen), Arc::clone(&lanes.primary));
    promise.future().on_settled(ThreadKind::Primary, move |value| {
        seen_clone.lock().push((value, primary.is_current()));
    });

    promise.set(42);
    assert!(seen.lock().is_empty(), "primary work waits for the pump");

    lanes.primary.pump_all();
    assert_eq!(*seen.lock(), vec![(42, true)]);
    lanes.primary.pump_all();
    assert_eq!(seen.lock().len(), 1);
    test_complete!("set_42_is_seen_once_on_primary");
}

#[test]
fn continuations_fire_in_attachment_order() {
    init_test_logging();
    let lanes = Lanes::new();
    let dispatcher = lanes.dispatcher("ordering");
    let promise = Promise::<u32>::new_in(&dispatcher);
    let future = promise.future();

    let order = Arc::new(Mutex::new(Vec::new()));
    for i in 0..16 {
        let order = Arc::clone(&order);
        let lane = if i % 2 == 0 {
            ThreadKind::Primary
        } else {
            ThreadKind::Secondary
        };
        future.on_settled(lane, move |v| order.lock().push((lane, i, v)));
    }
    promise.set(3);
    lanes.primary.pump_all();
    lanes.secondary.pump_all();

    let order = order.lock();
    assert_eq!(order.len(), 16);
    for lane in [ThreadKind::Primary, ThreadKind::Secondary] {
        let indices: Vec<_> = order
            .iter()
            .filter(|(l, _, _)| *l == lane)
            .map(|(_, i, _)| *i)
            .collect();
        let mut sorted = indices.clone();
        sorted.sort_unstable();
        assert_eq!(indices, sorted, "{lane} continuations out of order");
    }
    assert!(order.iter().all(|(_, _, v)| *v == 3));
}

#[test]
fn late_caller_attach_runs_on_worker_not_inline() {
    init_test_logging();
    test_phase!("late_caller_attach_runs_on_worker_not_inline");
    let lanes = Lanes::new();
    let dispatcher = lanes.dispatcher("late-attach");
    let promise = Promise::<String>::new_in(&dispatcher);
    promise.set("ready".to_string());

    let attacher = thread::current().id();
    let observed = Arc::new(Mutex::new(None));
    let (observed_clone, pool) = (Arc::clone(&observed), lanes.pool.handle());
    promise.future().on_settled(ThreadKind::Caller, move |value| {
        use lanesync::Executor;
        *observed_clone.lock() = Some((value, thread::current().id(), pool.is_current()));
    });

    wait_until("late continuation", || observed.lock().is_some());
    let (value, ran_on, on_pool) = observed.lock().take().unwrap();
    assert_eq!(value, "ready");
    assert_ne!(ran_on, attacher);
    assert!(on_pool);
    test_complete!("late_caller_attach_runs_on_worker_not_inline");
}

#[test]
fn late_primary_attach_waits_for_pump() {
    init_test_logging();
    let lanes = Lanes::new();
    let dispatcher = lanes.dispatcher("late-primary");
    let promise = Promise::<u8>::new_in(&dispatcher);
    promise.set(1);

    let hits = Arc::new(AtomicUsize::new(0));
    let hits_clone = Arc::clone(&hits);
    promise.future().on_settled(ThreadKind::Primary, move |_| {
        hits_clone.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    lanes.primary.pump_all();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn attach_from_inside_firing_is_deferred() {
    init_test_logging();
    let lanes = Lanes::new();
    let dispatcher = lanes.dispatcher("reentrant");
    let promise = Promise::<u8>::new_in(&dispatcher);
    let future = promise.future();

    let log = Arc::new(Mutex::new(Vec::new()));
    let (inner_future, inner_log) = (future.clone(), Arc::clone(&log));
    future.on_settled(ThreadKind::Caller, move |_| {
        inner_log.lock().push("outer-start");
        let nested_log = Arc::clone(&inner_log);
        inner_future.on_settled(ThreadKind::Primary, move |_| nested_log.lock().push("nested"));
        inner_log.lock().push("outer-end");
    });

    promise.set(0);
    assert_eq!(*log.lock(), vec!["outer-start", "outer-end"]);
    lanes.primary.pump_all();
    assert_eq!(*log.lock(), vec!["outer-start", "outer-end", "nested"]);
}

#[test]
fn continuation_runs_in_owner_scope() {
    init_test_logging();
    let lanes = Lanes::new();
    let dispatcher = lanes.dispatcher("scoped-continuation");
    let promise = Promise::<u8>::new_in(&dispatcher);

    let scope_owner = Arc::new(Mutex::new(None));
    let scope_clone = Arc::clone(&scope_owner);
    promise.future().on_settled(ThreadKind::Worker, move |_| {
        *scope_clone.lock() = DispatcherScope::current().map(|d| d.handle());
    });
    promise.set(1);

    wait_until("worker continuation", || scope_owner.lock().is_some());
    assert_eq!(*scope_owner.lock(), Some(dispatcher.handle()));
}

#[test]
fn destroyed_owner_falls_back_to_global() {
    init_test_logging();
    test_phase!("destroyed_owner_falls_back_to_global");
    let lanes = Lanes::new();
    let dispatcher = lanes
        .builder("short-lived")
        .leak_response(LeakResponse::Silent)
        .build_scoped()
        .unwrap();
    let promise = Promise::<u8>::new_in(&dispatcher);

    let kind = Arc::new(Mutex::new(None));
    let kind_clone = Arc::clone(&kind);
    promise.future().on_settled(ThreadKind::Worker, move |v| {
        *kind_clone.lock() = Some((v, DispatcherScope::current().map(|d| d.kind())));
    });

    let leaked = dispatcher.shutdown();
    assert_eq!(leaked.len(), 1);
    promise.set(9);

    wait_until("global delivery", || kind.lock().is_some());
    assert_eq!(*kind.lock(), Some((9, Some(DispatcherKind::Global))));
    test_complete!("destroyed_owner_falls_back_to_global");
}

#[test]
fn wrap_tracks_under_wrapping_dispatcher() {
    init_test_logging();
    let lanes = Lanes::new();
    let remote = lanes.dispatcher("remote");
    let local = lanes.dispatcher("local");

    let foreign = Promise::<u64>::new_in(&remote);
    let wrapped = local.wrap(&foreign.future());
    assert_eq!(wrapped.owner(), local.handle());
    assert_eq!(local.num_promises(), 1);
    assert_eq!(remote.num_promises(), 1);

    foreign.set(77);
    assert_eq!(wrapped.try_get(), Some(77));
    assert_eq!(local.num_promises(), 0);
    assert_eq!(remote.num_promises(), 0);
}

#[test]
fn wrap_of_settled_future_settles_immediately() {
    init_test_logging();
    let lanes = Lanes::new();
    let local = lanes.dispatcher("local-settled");
    let remote = lanes.dispatcher("remote-settled");
    let foreign = Promise::<u8>::new_in(&remote);
    foreign.set(4);

    let wrapped = local.wrap(&foreign.future());
    assert_eq!(wrapped.try_get(), Some(4));
    assert_eq!(local.num_promises(), 0);
}

#[test]
fn call_in_global_scope_wraps_into_caller() {
    init_test_logging();
    let lanes = Lanes::new();
    let dispatcher = lanes.dispatcher("caller-side");
    let _scope = DispatcherScope::enter(&dispatcher);

    let inner_kind = Arc::new(Mutex::new(None));
    let inner_clone = Arc::clone(&inner_kind);
    let global_promise = Arc::new(Mutex::new(None));
    let promise_slot = Arc::clone(&global_promise);
    let future = DispatcherScope::call_in_global_scope(move || {
        *inner_clone.lock() = Some(DispatcherScope::get().kind());
        let promise = Promise::<u16>::new();
        let future = promise.future();
        *promise_slot.lock() = Some(promise);
        future
    });

    assert_eq!(*inner_kind.lock(), Some(DispatcherKind::Global));
    assert_eq!(future.owner(), dispatcher.handle());
    assert_eq!(dispatcher.num_promises(), 1);

    global_promise.lock().take().unwrap().set(12);
    assert_eq!(future.try_get(), Some(12));
}

#[test]
fn then_on_worker_then_primary() {
    init_test_logging();
    let lanes = Lanes::new();
    let dispatcher = lanes.dispatcher("pipeline");
    let promise = Promise::<u32>::new_in(&dispatcher);

    let result = Arc::new(Mutex::new(None));
    let result_clone = Arc::clone(&result);
    let primary = Arc::clone(&lanes.primary);
    promise
        .future()
        .then(ThreadKind::Worker, |n| n * 3)
        .on_settled(ThreadKind::Primary, move |n| {
            *result_clone.lock() = Some((n, primary.is_current()));
        });

    promise.set(14);
    lanes.pump_until("pipeline result", || result.lock().is_some());
    assert_eq!(*result.lock(), Some((42, true)));
    assert_eq!(dispatcher.num_promises(), 0);
}

#[test]
fn await_value_set_on_worker() {
    init_test_logging();
    let lanes = Lanes::new();
    let dispatcher = lanes.dispatcher("awaited");
    let promise = Promise::<Vec<u8>>::new_in(&dispatcher);
    let future = promise.future();

    dispatcher.dispatch(ThreadKind::Worker, move || promise.set(vec![1, 2, 3]));
    let value = futures_lite::future::block_on(async move { future.await });
    assert_eq!(value, vec![1, 2, 3]);
}

#[test]
fn attaches_racing_set_are_each_delivered_once() {
    init_test_logging();
    test_phase!("attaches_racing_set_are_each_delivered_once");
    const THREADS: usize = 4;
    const PER_THREAD: usize = 50;

    let lanes = Lanes::new();
    let dispatcher = lanes.dispatcher("racing");
    let promise = Promise::<u32>::new_in(&dispatcher);
    let deliveries = Arc::new(Mutex::new(Vec::new()));
    let barrier = Arc::new(std::sync::Barrier::new(THREADS + 1));

    let attachers: Vec<_> = (0..THREADS)
        .map(|t| {
            let (future, deliveries, barrier) =
                (promise.future(), Arc::clone(&deliveries), Arc::clone(&barrier));
            thread::spawn(move || {
                barrier.wait();
                for i in 0..PER_THREAD {
                    let deliveries = Arc::clone(&deliveries);
                    let lane = if i % 2 == 0 {
                        ThreadKind::Caller
                    } else {
                        ThreadKind::Worker
                    };
                    future.on_settled(lane, move |v| deliveries.lock().push((t, i, v)));
                }
            })
        })
        .collect();

    let setter = {
        let (promise, barrier) = (promise.clone(), Arc::clone(&barrier));
        thread::spawn(move || {
            barrier.wait();
            promise.set(7);
        })
    };
    for attacher in attachers {
        attacher.join().unwrap();
    }
    setter.join().unwrap();

    wait_until("every delivery", || deliveries.lock().len() == THREADS * PER_THREAD);
    let mut seen: Vec<_> = deliveries.lock().iter().map(|(t, i, _)| (*t, *i)).collect();
    assert!(deliveries.lock().iter().all(|(_, _, v)| *v == 7));
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen.len(), THREADS * PER_THREAD);
    assert_eq!(dispatcher.num_promises(), 0);
    test_complete!("attaches_racing_set_are_each_delivered_once");
}
