// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![expect(missing_docs, reason = "Benchmark code")]

//! Benchmarks of the scheduler over a virtual clock. The scenarios:
//! * Schedule 1000 one-shot tasks spread across one second and fire them with one jump
//! * Catch up 1000 executions of a single fixed-rate task
//! * Cancel half of 1000 queued tasks and purge them

use std::hint::black_box;
use std::time::Duration;

use chime::{ClockControl, SchedulerOptions, TimerTask, VirtualScheduler};
use criterion::{Criterion, criterion_group, criterion_main};

const TASKS: u64 = 1000;

fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler");

    group.bench_function("one_shot_fire", |b| {
        b.iter(|| black_box(one_shot_fire()));
    });

    group.bench_function("fixed_rate_catch_up", |b| {
        b.iter(|| black_box(fixed_rate_catch_up()));
    });

    group.bench_function("cancel_and_purge", |b| {
        b.iter(|| black_box(cancel_and_purge()));
    });

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default();
    targets = criterion_benchmark
}

criterion_main!(benches);

fn scheduler() -> VirtualScheduler {
    VirtualScheduler::with_options(ClockControl::new(), SchedulerOptions::default().enable_logs(false))
}

fn one_shot_fire() -> usize {
    let scheduler = scheduler();

    for n in 0..TASKS {
        scheduler
            .schedule(&TimerTask::new(|_| {}), Duration::from_millis(n))
            .expect("scheduling a fresh task succeeds");
    }

    scheduler.simulate_millis(TASKS).fired
}

fn fixed_rate_catch_up() -> usize {
    let scheduler = scheduler();
    let task = TimerTask::new(|_| {});

    scheduler
        .schedule_at_fixed_rate(&task, Duration::from_millis(1), Duration::from_millis(1))
        .expect("scheduling a fresh task succeeds");

    scheduler.simulate_millis(TASKS).fired
}

fn cancel_and_purge() -> usize {
    let scheduler = scheduler();
    let tasks: Vec<_> = (0..TASKS).map(|_| TimerTask::new(|_| {})).collect();

    for (n, task) in (1..).zip(&tasks) {
        scheduler
            .schedule(task, Duration::from_millis(n))
            .expect("scheduling a fresh task succeeds");
    }

    for task in tasks.iter().step_by(2) {
        task.cancel();
    }

    scheduler.purge()
}
