use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group};

use crate::engine::IndexStrategy;
use crate::engine::embedded::EmbeddedEngine;
use crate::engine::policy::CombiningAlgorithm;
use crate::harness::Summary;
use crate::suite::{PolicyGenerator, WorkloadParams};

/// Reduction of one configuration's execution samples.
fn bench_statistics(c: &mut Criterion) {
    let mut group = c.benchmark_group("statistics_summary");
    for size in [100usize, 10_000, 100_000] {
        let samples: Vec<f64> = (0..size).map(|i| ((i * 7919) % size) as f64 * 0.01).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &samples, |b, samples| {
            b.iter(|| black_box(Summary::from_samples(black_box(samples))))
        });
    }
    group.finish();
}

/// One decision against an in-memory policy set, per index strategy.
fn bench_embedded_decide(c: &mut Criterion) {
    let params = WorkloadParams {
        policy_count: 1000,
        ..WorkloadParams::default()
    };
    let mut generator = PolicyGenerator::new(&params);
    let policies = generator.policies();
    let requests: Vec<_> = (0..256).map(|_| generator.create_request()).collect();

    let mut group = c.benchmark_group("embedded_decide");
    for strategy in IndexStrategy::all() {
        let engine = EmbeddedEngine::new(CombiningAlgorithm::DenyOverrides, policies.clone(), strategy);
        group.bench_function(BenchmarkId::from_parameter(strategy), |b| {
            let mut n = 0;
            b.iter(|| {
                n = (n + 1) % requests.len();
                black_box(engine.evaluate(&requests[n]))
            })
        });
    }
    group.finish();
}

/// Building the policy index, the in-memory part of engine construction.
fn bench_index_build(c: &mut Criterion) {
    let params = WorkloadParams {
        policy_count: 1000,
        ..WorkloadParams::default()
    };
    let policies = PolicyGenerator::new(&params).policies();

    let mut group = c.benchmark_group("embedded_construct");
    for strategy in IndexStrategy::all() {
        group.bench_function(BenchmarkId::from_parameter(strategy), |b| {
            b.iter(|| {
                black_box(EmbeddedEngine::new(
                    CombiningAlgorithm::DenyOverrides,
                    policies.clone(),
                    strategy,
                ))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_statistics, bench_embedded_decide, bench_index_build);
