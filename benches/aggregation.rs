use criterion::measurement::WallTime;
use criterion::{criterion_group, criterion_main, BenchmarkGroup, Criterion};
use screenshare_analysis::analysis::{cpu_vs_viewers, latency_vs_loss, legibility_vs_bandwidth, Analysis};
use screenshare_analysis::loader::records_from_json;
use screenshare_analysis::record::ResultRecord;
use screenshare_analysis::sample_data::{generate_results, rng_from_seed};
use screenshare_analysis::summary::SummaryStatistics;
use std::hint::black_box;

fn sample_records(copies: usize) -> Vec<ResultRecord> {
    let mut rng = rng_from_seed(Some(17));
    let mut results = Vec::new();
    for _ in 0..copies {
        results.extend(generate_results(&mut rng));
    }
    let (records, _excluded) = records_from_json(results).unwrap();
    records
}

fn benchmark(c: &mut Criterion) {
    let records = sample_records(20);

    let mut group: BenchmarkGroup<WallTime> = c.benchmark_group("aggregation");
    group.bench_function("cpu_vs_viewers", |b| {
        b.iter(|| cpu_vs_viewers(black_box(&records)))
    });
    group.bench_function("latency_vs_loss", |b| {
        b.iter(|| latency_vs_loss(black_box(&records)))
    });
    group.bench_function("legibility_vs_bandwidth", |b| {
        b.iter(|| legibility_vs_bandwidth(black_box(&records)))
    });
    group.bench_function("all_charts", |b| {
        b.iter(|| {
            Analysis::ALL
                .iter()
                .filter_map(|analysis| analysis.chart(black_box(&records)))
                .count()
        })
    });
    group.bench_function("summary", |b| {
        b.iter(|| SummaryStatistics::build(black_box(&records)).unwrap())
    });
    group.finish();
}

criterion_group!(benches, benchmark);
criterion_main!(benches);
