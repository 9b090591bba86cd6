//! Benchmarks for the media task scheduler.
//!
//! Benchmarks cover:
//! - Raw queue push/pop with mixed priorities
//! - Submit throughput
//! - Claiming batches of ready tasks
//! - Claiming through a queue full of stale entries
//! - A full submit, claim, complete, reap cycle

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;

use media_task_scheduler::core::{TaskId, TaskQueue, TaskScheduler, TaskStatus};
use media_task_scheduler::infra::queue::InMemoryQueue;

// ============================================================================
// Helper Functions
// ============================================================================

#[allow(dead_code)]
#[derive(Debug, Clone)]
struct BenchVideo {
    bvid: String,
}

fn video(n: u64) -> BenchVideo {
    BenchVideo {
        bvid: format!("BV{n:08}"),
    }
}

fn priorities(count: u64, seed: u64) -> Vec<i32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count).map(|_| rng.random_range(0..10)).collect()
}

fn loaded_scheduler(size: u64) -> TaskScheduler<BenchVideo> {
    let scheduler = TaskScheduler::new();
    for (n, priority) in (0..size).zip(priorities(size, 42)) {
        scheduler.submit(video(n), priority).unwrap();
    }
    scheduler
}

// ============================================================================
// Queue Benchmarks
// ============================================================================

fn bench_queue_push_pop(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_push_pop");

    for size in [100, 1_000, 10_000] {
        let prios = priorities(size, 7);
        let ids: Vec<TaskId> = (0..size).map(|_| TaskId::new()).collect();
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let mut q = InMemoryQueue::with_capacity(ids.len());
                for (id, priority) in ids.iter().zip(&prios) {
                    q.push(*id, *priority);
                }
                while let Some(id) = q.pop() {
                    black_box(id);
                }
            });
        });
    }
    group.finish();
}

// ============================================================================
// Scheduler Benchmarks
// ============================================================================

fn bench_submit(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler_submit");

    for size in [100, 1_000, 10_000] {
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| black_box(loaded_scheduler(size)));
        });
    }
    group.finish();
}

fn bench_next_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler_next_batch");

    for batch in [1, 10, 100] {
        group.throughput(Throughput::Elements(1_000));
        group.bench_with_input(BenchmarkId::from_parameter(batch), &batch, |b, &batch| {
            b.iter_batched(
                || loaded_scheduler(1_000),
                |scheduler| {
                    while !scheduler.next_batch(batch).is_empty() {}
                    black_box(scheduler.stats())
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_next_batch_through_stale(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler_stale_scan");

    for stale in [100, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(stale), &stale, |b, &stale| {
            b.iter_batched(
                || {
                    let scheduler = TaskScheduler::new();
                    // Claimed outside the queue, so every entry is stale.
                    for n in 0..stale {
                        let id = scheduler.submit(video(n), 9).unwrap();
                        scheduler.set_status(id, TaskStatus::Processing).unwrap();
                        scheduler.set_status(id, TaskStatus::Completed).unwrap();
                    }
                    scheduler.submit(video(stale), 0).unwrap();
                    scheduler
                },
                |scheduler| {
                    let mut claimed = 0;
                    while claimed == 0 {
                        claimed += scheduler.next_batch(16).len();
                    }
                    black_box(claimed)
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

// ============================================================================
// End-to-End Scenario
// ============================================================================

fn bench_lifecycle_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler_lifecycle");
    group.throughput(Throughput::Elements(500));

    group.bench_function("submit_claim_complete_reap_500", |b| {
        let prios = priorities(500, 3);
        b.iter(|| {
            let scheduler = TaskScheduler::new();
            for (n, priority) in prios.iter().enumerate() {
                scheduler.submit(video(n as u64), *priority).unwrap();
            }
            loop {
                let batch = scheduler.next_batch(32);
                if batch.is_empty() {
                    break;
                }
                for id in batch {
                    scheduler.report_progress(id, 100).unwrap();
                    scheduler.set_status(id, TaskStatus::Completed).unwrap();
                }
            }
            black_box(scheduler.reap_completed())
        });
    });
    group.finish();
}

criterion_group!(queue_benches, bench_queue_push_pop);

criterion_group!(
    scheduler_benches,
    bench_submit,
    bench_next_batch,
    bench_next_batch_through_stale
);

criterion_group!(scenario_benches, bench_lifecycle_cycle);

criterion_main!(queue_benches, scheduler_benches, scenario_benches);
