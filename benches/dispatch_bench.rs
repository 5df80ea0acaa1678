//! Benchmarks for Task execution and program dispatch throughput.
//!
//! # Benchmark Categories
//!
//! 1. **Task chain**: depth of `chain` / `map` pipelines
//! 2. **Task sequence**: fan-in of many small Tasks
//! 3. **Dispatch**: messages per settle through a running program, with and
//!    without a command per message

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use teaflow::prelude::*;

// =============================================================================
// Task Benchmarks
// =============================================================================

fn chained(depth: usize) -> Task<Never, u64> {
    (0..depth).fold(Task::succeed(0_u64), |task, _| {
        task.chain(|n| Task::succeed(n + 1)).map(|n| n * 1)
    })
}

fn benchmark_task_chain(criterion: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
    let mut group = criterion.benchmark_group("task_chain");

    for depth in [1, 10, 100] {
        let task = chained(depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &task, |bencher, task| {
            bencher
                .to_async(&runtime)
                .iter(|| async { black_box(task.run_safe().await) });
        });
    }

    group.finish();
}

fn benchmark_task_sequence(criterion: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
    let mut group = criterion.benchmark_group("task_sequence");

    for size in [10, 100, 1000] {
        let task = Task::sequence((0..size).map(Task::<Never, u64>::succeed).collect());
        group.bench_with_input(BenchmarkId::from_parameter(size), &task, |bencher, task| {
            bencher
                .to_async(&runtime)
                .iter(|| async { black_box(task.run_safe().await.len()) });
        });
    }

    group.finish();
}

// =============================================================================
// Dispatch Benchmarks
// =============================================================================

#[derive(Clone)]
enum Msg {
    Add(u64),
    Echo(u64),
}

fn counter() -> Program<(), u64, Msg> {
    Program::worker(
        |()| (0, Cmd::none()),
        |message, model: &Arc<u64>| match message {
            Msg::Add(n) => (Arc::new(**model + n), Cmd::none()),
            Msg::Echo(n) => (
                Arc::clone(model),
                Task::<Never, u64>::succeed(n).perform(Msg::Add),
            ),
        },
        |_| Sub::none(),
    )
}

fn benchmark_dispatch(criterion: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
    let mut group = criterion.benchmark_group("dispatch");

    for messages in [100_u64, 1000] {
        group.bench_with_input(BenchmarkId::new("update_only", messages), &messages, |bencher, &messages| {
            bencher.to_async(&runtime).iter(|| async move {
                let handle = counter().init(());
                for n in 0..messages {
                    handle.dispatch(Msg::Add(n)).expect("program running");
                }
                handle.settled().await;
                black_box(*handle.get_model())
            });
        });

        group.bench_with_input(BenchmarkId::new("with_command", messages), &messages, |bencher, &messages| {
            bencher.to_async(&runtime).iter(|| async move {
                let handle = counter().init(());
                for n in 0..messages {
                    handle.dispatch(Msg::Echo(n)).expect("program running");
                }
                handle.settled().await;
                black_box(*handle.get_model())
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_task_chain,
    benchmark_task_sequence,
    benchmark_dispatch
);
criterion_main!(benches);
