/// Power series extraction benchmarks
///
/// Measures measurement parsing and series derivation for run lengths
/// typical of 100ms sampling (seconds to an hour of profiling).
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use jupyter_energi::config::ColumnConfig;
use jupyter_energi::extractor::extract_power_series;
use jupyter_energi::measurement::RawSampleSet;

const WIDTH: usize = 30;

/// Synthetic profiler output: delta time, timestamp, filler, energy counter at column 27
fn synthetic_csv(rows: usize) -> String {
    let mut csv = (0..WIDTH)
        .map(|i| format!("col{}", i))
        .collect::<Vec<_>>()
        .join(",");
    csv.push('\n');
    let mut energy = 0.0;
    for row in 0..rows {
        energy += 1.5 + (row % 7) as f64 * 0.1;
        let fields: Vec<String> = (0..WIDTH)
            .map(|col| match col {
                0 => "100".to_string(),
                1 => (1_700_000_000_000u64 + row as u64 * 100).to_string(),
                27 => format!("{:.3}", energy),
                _ => "0.5".to_string(),
            })
            .collect();
        csv.push_str(&fields.join(","));
        csv.push('\n');
    }
    csv
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_measurements");
    for rows in [100usize, 1_000, 36_000] {
        let csv = synthetic_csv(rows);
        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &csv, |b, csv| {
            b.iter(|| RawSampleSet::from_reader(black_box(csv.as_bytes())).unwrap());
        });
    }
    group.finish();
}

fn bench_extract(c: &mut Criterion) {
    let columns = ColumnConfig::new(0, 27, true);
    let mut group = c.benchmark_group("extract_power_series");
    for rows in [100usize, 1_000, 36_000] {
        let set = RawSampleSet::from_reader(synthetic_csv(rows).as_bytes()).unwrap();
        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::new("cumulative", rows), &set, |b, set| {
            b.iter(|| extract_power_series(black_box(set), true, &columns).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("interval", rows), &set, |b, set| {
            b.iter(|| extract_power_series(black_box(set), false, &columns).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_extract);
criterion_main!(benches);
