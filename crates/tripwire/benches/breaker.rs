// Copyright (c) Microsoft Corporation.

use criterion::{Criterion, criterion_group, criterion_main};
use futures::executor::block_on;
use tick::Clock;
use tripwire::{CircuitBreaker, Sampling};

async fn operation() -> Result<u64, ()> {
    Ok(42)
}

pub fn entry(c: &mut Criterion) {
    let mut group = c.benchmark_group("circuit_breaker");
    let clock = Clock::new_frozen();

    // Baseline without a circuit breaker
    group.bench_function("no-circuit-breaker", |b| b.iter(|| block_on(operation())));

    // With circuit breaker in closed state, every outcome evaluated
    let breaker = CircuitBreaker::builder("bench_strict", &clock)
        .failure_threshold(u32::MAX) // keep the circuit closed
        .build();
    group.bench_function("with-circuit-breaker", |b| {
        b.iter(|| block_on(breaker.execute(operation)));
    });

    // With circuit breaker evaluating one in eight outcomes
    let breaker = CircuitBreaker::builder("bench_sampled", &clock)
        .failure_threshold(u32::MAX)
        .sampling(Sampling::every(8))
        .build();
    group.bench_function("with-sampled-circuit-breaker", |b| {
        b.iter(|| block_on(breaker.execute(operation)));
    });

    group.finish();
}

criterion_group!(benches, entry);
criterion_main!(benches);
