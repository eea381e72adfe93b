use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use feature_engine::{FeatureAssembler, SensorRecord, WINDOW_SIZE};

fn readings() -> Vec<SensorRecord> {
    let base = NaiveDate::from_ymd_opt(2024, 1, 15)
        .and_then(|d| d.and_hms_opt(11, 0, 0))
        .expect("valid date");
    (0..WINDOW_SIZE)
        .map(|i| SensorRecord {
            id: 1000 - i as i64,
            mp10: 12.0,
            mp25: 8.0,
            co: 0.4 + i as f64 * 0.01,
            nox: 20.0,
            vehicle_flow: 150.0,
            created_at: base - Duration::minutes(15 * i as i64),
        })
        .rev()
        .collect()
}

fn bench_assemble(c: &mut Criterion) {
    let assembler = FeatureAssembler::default();
    let records = readings();
    c.bench_function("assemble_unordered_window", |b| {
        b.iter(|| assembler.assemble(black_box(records.clone())))
    });
}

criterion_group!(benches, bench_assemble);
criterion_main!(benches);
