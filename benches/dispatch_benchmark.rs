//! Dispatch and promise benchmark suite for lanesync.
//!
//! Benchmarks the hot paths:
//! - SlotTable: insert/remove churn and generation-checked lookup
//! - Registry: handle resolution for live and stale handles
//! - Promise: create/set with and without continuations
//! - Dispatch: caller-inline and pump-queue round trips
//!
//! Performance targets:
//! - SlotTable insert/remove: < 50ns
//! - Handle resolve: < 100ns
//! - Promise create+set (tracked, no continuations): < 500ns

#![allow(missing_docs)]
#![allow(clippy::semicolon_if_nothing_returned)]

use criterion::{
    black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput,
};

use lanesync::dispatcher::registry;
use lanesync::util::SlotTable;
use lanesync::{
    DispatcherBuilder, Promise, PumpQueue, ScopedDispatcher, ThreadContexts, ThreadKind,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn inline_dispatcher(name: &str) -> ScopedDispatcher {
    DispatcherBuilder::new()
        .name(name)
        .contexts(ThreadContexts::inline())
        .build_scoped()
        .expect("bench dispatcher")
}

fn pumped_dispatcher(name: &str) -> (ScopedDispatcher, Arc<PumpQueue>) {
    let primary = Arc::new(PumpQueue::new("bench-primary"));
    let contexts = ThreadContexts::new(
        primary.clone(),
        Arc::new(PumpQueue::new("bench-secondary")),
        Arc::new(PumpQueue::new("bench-worker")),
    );
    let dispatcher = DispatcherBuilder::new()
        .name(name)
        .contexts(contexts)
        .build_scoped()
        .expect("bench dispatcher");
    (dispatcher, primary)
}

// =============================================================================
// SLOT TABLE BENCHMARKS
// =============================================================================

fn bench_slot_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("slots/table");

    group.bench_function("insert_remove_single", |b| {
        let mut table = SlotTable::new();
        b.iter(|| {
            let key = table.insert(black_box(7u64));
            black_box(table.remove(key))
        })
    });

    for &count in &[16u64, 256, 4096] {
        group.throughput(Throughput::Elements(count));
        group.bench_with_input(BenchmarkId::new("get_live", count), &count, |b, &count| {
            let mut table = SlotTable::new();
            let keys: Vec<_> = (0..count).map(|i| table.insert(i)).collect();
            b.iter(|| {
                for key in &keys {
                    let _ = black_box(table.get(*key));
                }
            })
        });
    }

    group.finish();
}

// =============================================================================
// REGISTRY BENCHMARKS
// =============================================================================

fn bench_registry(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatcher/registry");

    let live = inline_dispatcher("bench-live");
    let live_handle = live.handle();
    group.bench_function("resolve_live", |b| {
        b.iter(|| black_box(registry().resolve(black_box(live_handle))))
    });

    let stale_handle = inline_dispatcher("bench-stale").handle();
    group.bench_function("resolve_stale", |b| {
        b.iter(|| black_box(registry().resolve(black_box(stale_handle))))
    });

    group.bench_function("create_teardown", |b| {
        b.iter(|| black_box(inline_dispatcher("bench-churn")))
    });

    group.finish();
}

// =============================================================================
// PROMISE BENCHMARKS
// =============================================================================

fn bench_promise(c: &mut Criterion) {
    let mut group = c.benchmark_group("promise");
    let dispatcher = inline_dispatcher("bench-promise");

    group.bench_function("create_set", |b| {
        b.iter(|| {
            let promise = Promise::<u64>::new_in(&dispatcher);
            promise.set(black_box(1));
            black_box(promise)
        })
    });

    for &count in &[1usize, 4, 32] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(
            BenchmarkId::new("set_with_caller_continuations", count),
            &count,
            |b, &count| {
                let hits = Arc::new(AtomicUsize::new(0));
                b.iter_batched(
                    || {
                        let promise = Promise::<u64>::new_in(&dispatcher);
                        let future = promise.future();
                        for _ in 0..count {
                            let hits = Arc::clone(&hits);
                            future.on_settled(ThreadKind::Caller, move |_| {
                                hits.fetch_add(1, Ordering::Relaxed);
                            });
                        }
                        promise
                    },
                    |promise| promise.set(black_box(2)),
                    BatchSize::SmallInput,
                )
            },
        );
    }

    group.bench_function("then_chain_8", |b| {
        b.iter(|| {
            let promise = Promise::<u64>::new_in(&dispatcher);
            let mut future = promise.future();
            for _ in 0..8 {
                future = future.then(ThreadKind::Caller, |v| v + 1);
            }
            promise.set(0);
            black_box(future.try_get())
        })
    });

    group.finish();
}

// =============================================================================
// DISPATCH BENCHMARKS
// =============================================================================

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatcher/dispatch");

    let inline = inline_dispatcher("bench-inline");
    group.bench_function("caller_inline", |b| {
        b.iter(|| inline.dispatch(ThreadKind::Caller, || black_box(())))
    });

    let (pumped, primary) = pumped_dispatcher("bench-pumped");
    for &count in &[1u64, 64, 1024] {
        group.throughput(Throughput::Elements(count));
        group.bench_with_input(
            BenchmarkId::new("primary_submit_pump", count),
            &count,
            |b, &count| {
                b.iter(|| {
                    for _ in 0..count {
                        pumped.dispatch(ThreadKind::Primary, || black_box(()));
                    }
                    black_box(primary.pump_all())
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_slot_table,
    bench_registry,
    bench_promise,
    bench_dispatch,
);
criterion_main!(benches);
