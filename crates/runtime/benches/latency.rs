use core_sim::{path_rng, BatchRequest, BetConfig, SimLimits};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use runtime::{metrics::PathLatencyMetrics, TARGET_PATHS_PER_SEC};
use std::time::Instant;
use strategy::StakePolicy;

const LATENCY_SAMPLES: u64 = 5_000;

fn bench_path_latency(c: &mut Criterion) {
    let bet = BetConfig::binary(0.55, 1.0, StakePolicy::kelly()).expect("bench bet should be valid");
    let limits = SimLimits::new(1_000.0, 1.0, 1_000).expect("bench limits should be valid");
    let request =
        BatchRequest::new(bet, limits, LATENCY_SAMPLES, false, 11).expect("bench request should be valid");
    let plan = request.resolve_stake().expect("stake should resolve");
    let simulator = request.simulator(plan.stake);

    let mut metrics = PathLatencyMetrics::new();
    for path_index in 0..LATENCY_SAMPLES {
        let started = Instant::now();
        let result = simulator.run(path_index, &mut path_rng(request.seed(), path_index));
        metrics.record_latency_nanos(started.elapsed().as_nanos() as u64);
        black_box(result);
    }

    if let Some(report) = metrics.percentiles() {
        let budget_nanos = 1_000_000_000 / TARGET_PATHS_PER_SEC;
        println!(
            "path_budget_nanos={budget_nanos} p50_nanos={} p95_nanos={} p99_nanos={} max_nanos={} samples={}",
            report.p50_nanos, report.p95_nanos, report.p99_nanos, report.max_nanos, report.count
        );
    }

    c.bench_function("path_latency_single_path", |b| {
        let mut path_index = 0;
        b.iter(|| {
            path_index += 1;
            black_box(simulator.run(path_index, &mut path_rng(request.seed(), path_index)))
        });
    });

    c.bench_function("stake_resolution_utility_optimal", |b| {
        let bet = BetConfig::binary(
            0.55,
            1.0,
            StakePolicy::UtilityOptimal {
                gamma: 2.0,
                fun_weight: 0.05,
                fun_scale: 1.0,
            },
        )
        .expect("bench bet should be valid");
        b.iter(|| black_box(core_sim::resolve_stake(&bet, 1_000.0)));
    });
}

criterion_group!(benches, bench_path_latency);
criterion_main!(benches);
