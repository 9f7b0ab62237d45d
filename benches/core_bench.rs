use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rug::float::Round;
use rug::{Float, Integer};
use std::collections::BTreeSet;
use std::sync::Arc;
use trialhunt::scheduler::{first_candidate, partition, plan_round};
use trialhunt::worker::PrimeWorker;
use trialhunt::{bigmath, Batch};

fn odd_primes_up_to(limit: u64) -> BTreeSet<Integer> {
    let mut primes = BTreeSet::new();
    let mut n = 3u64;
    while n <= limit {
        if (3..)
            .step_by(2)
            .take_while(|d| d * d <= n)
            .all(|d| n % d != 0)
        {
            primes.insert(Integer::from(n));
        }
        n += 2;
    }
    primes
}

fn bench_sqrt_small(c: &mut Criterion) {
    let x = Float::with_val(64, 2);
    c.bench_function("sqrt(2, 50 digits)", |b| {
        b.iter(|| bigmath::sqrt(black_box(&x), black_box(50), Round::Nearest));
    });
}

fn bench_sqrt_large(c: &mut Criterion) {
    // 2^1000 + 1: f64 guess unavailable, Newton starts from x/2
    let n = (Integer::from(1u32) << 1000u32) + 1u32;
    let x = Float::with_val(1100, &n);
    c.bench_function("sqrt(2^1000+1, 320 digits)", |b| {
        b.iter(|| bigmath::sqrt(black_box(&x), black_box(320), Round::Nearest));
    });
}

fn bench_integer_sqrt(c: &mut Criterion) {
    let n = (Integer::from(1u32) << 127u32) - 1u32;
    c.bench_function("integer_sqrt(M127)", |b| {
        b.iter(|| bigmath::integer_sqrt(black_box(&n)));
    });
}

fn bench_worker_batch(c: &mut Criterion) {
    let known = Arc::new(odd_primes_up_to(1_001));
    let batch = Batch::new(Integer::from(1_003), Integer::from(21_001));
    c.bench_function("worker(1,003..21,001)", |b| {
        b.iter(|| {
            let mut worker = PrimeWorker::new(black_box(&batch), Arc::clone(&known));
            worker.generate().map(|_| worker.tested())
        });
    });
}

fn bench_plan_and_partition(c: &mut Criterion) {
    let frontier = Integer::from(1_000_000_007u64);
    c.bench_function("plan_round+partition(16 workers)", |b| {
        b.iter(|| {
            let plan = plan_round(16, black_box(&frontier), 5_000, 20_000);
            partition(
                &first_candidate(&frontier),
                &plan.ceiling,
                plan.workers,
                &plan.chunk_size,
            )
        });
    });
}

criterion_group!(
    benches,
    bench_sqrt_small,
    bench_sqrt_large,
    bench_integer_sqrt,
    bench_worker_batch,
    bench_plan_and_partition,
);
criterion_main!(benches);
