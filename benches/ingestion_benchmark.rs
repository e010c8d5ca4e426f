use chrono::{Duration, FixedOffset, TimeZone};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nws_history::models::{NewRecord, Reading, RecordId, StoredRecord};
use nws_history::processors::{IngestionEngine, IntegrityChecker};
use nws_history::readers::parse_observations;
use nws_history::store::{MemoryStore, ObservationStore, TimeSeriesOptions};
use serde_json::json;

// Hourly observations, newest first, as the API returns them
fn create_observation_body(count: usize) -> String {
    let utc = FixedOffset::east_opt(0).unwrap();
    let start = utc.with_ymd_and_hms(2024, 1, 15, 23, 51, 0).unwrap();

    let features: Vec<_> = (0..count)
        .map(|i| {
            let timestamp = start - Duration::hours(i as i64);
            json!({
                "properties": {
                    "timestamp": timestamp.to_rfc3339(),
                    "temperature": {
                        "unitCode": "wmoUnit:degC",
                        "value": -5.0 + (i % 24) as f64 * 0.6
                    }
                }
            })
        })
        .collect();

    json!({ "type": "FeatureCollection", "features": features }).to_string()
}

fn create_readings(count: usize) -> Vec<Reading> {
    parse_observations(&create_observation_body(count))
        .unwrap()
        .readings
}

fn benchmark_parse_observations(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_observations");

    for count in [48, 500].iter() {
        let body = create_observation_body(*count);
        group.bench_with_input(BenchmarkId::new("features", count), &body, |b, body| {
            b.iter(|| black_box(parse_observations(black_box(body)).unwrap()))
        });
    }

    group.finish();
}

fn benchmark_ingestion(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingestion");
    let engine = IngestionEngine::new("KBOS");

    for count in [48, 500].iter() {
        let readings = create_readings(*count);

        group.bench_with_input(BenchmarkId::new("fresh", count), &readings, |b, readings| {
            b.iter(|| {
                let mut store = MemoryStore::new();
                store.ensure_collection(&TimeSeriesOptions::default()).unwrap();
                black_box(engine.ingest(&mut store, readings, None).unwrap())
            })
        });

        group.bench_with_input(BenchmarkId::new("repeat", count), &readings, |b, readings| {
            let mut store = MemoryStore::new();
            store.ensure_collection(&TimeSeriesOptions::default()).unwrap();
            engine.ingest(&mut store, readings, None).unwrap();
            b.iter(|| black_box(engine.ingest(&mut store, readings, None).unwrap()))
        });
    }

    group.finish();
}

fn benchmark_integrity_checker(c: &mut Criterion) {
    let readings = create_readings(500);
    let records: Vec<StoredRecord> = readings
        .iter()
        .enumerate()
        .map(|(i, r)| {
            StoredRecord::from_new(
                RecordId(i as i64 + 1),
                &NewRecord::new(r.key("KBOS"), r.temperature()),
            )
        })
        .collect();
    let checker = IntegrityChecker::new();

    c.bench_function("duplicate_scan_500", |b| {
        b.iter(|| black_box(checker.check_records(black_box(&records))))
    });
}

criterion_group!(
    benches,
    benchmark_parse_observations,
    benchmark_ingestion,
    benchmark_integrity_checker
);
criterion_main!(benches);
