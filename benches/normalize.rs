//! Benchmarks for normalization and export.
//!
//! Run with: `cargo bench`
//! Run specific group: `cargo bench --bench normalize -- export`

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chanpack::api::{PageResponse, RawRecord};
use chanpack::channel::ChannelDescriptor;
use chanpack::export::{ExportFormat, to_string};
use chanpack::normalize::normalize;
use chanpack::record::MessageRecord;
use serde_json::{Value, json};

// =============================================================================
// Test Data Generators
// =============================================================================

fn generate_raw(count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| {
            let id = i as i64 + 1;
            let mut message = json!({
                "type": "message",
                "id": id,
                "date": 1705314600 + id * 60,
                "from": "Rust News",
                "views": 1000 + i,
            });
            message["text"] = match i % 3 {
                0 => json!(format!("Release {i} is out: https://blog.example/{i} #release @ferris")),
                1 => json!([
                    "Read ",
                    {"type": "text_link", "text": "the notes", "href": format!("https://notes.example/{i}")},
                    " and share #rust"
                ]),
                _ => json!(""),
            };
            if i % 3 == 2 {
                message["media"] = json!({"mime_type": "image/jpeg", "width": 1280, "height": 720, "size": 204800});
            }
            message
        })
        .collect()
}

fn generate_records(count: usize) -> Vec<MessageRecord> {
    PageResponse::from_values(generate_raw(count), None)
        .records
        .iter()
        .filter_map(|raw| normalize(raw).ok().flatten())
        .collect()
}

// =============================================================================
// Normalization Benchmarks
// =============================================================================

fn bench_decode_and_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");

    for size in [100_usize, 1_000, 10_000] {
        let raw = generate_raw(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &raw, |b, raw| {
            b.iter(|| {
                let records: Vec<_> = raw
                    .iter()
                    .cloned()
                    .map(RawRecord::from_value)
                    .filter_map(|r| normalize(&r).ok().flatten())
                    .collect();
                black_box(records)
            });
        });
    }
    group.finish();
}

// =============================================================================
// Export Benchmarks
// =============================================================================

fn bench_export(c: &mut Criterion) {
    let mut group = c.benchmark_group("export");
    let descriptor = ChannelDescriptor::new(1, "rustnews".parse().unwrap(), "Rust News");

    for format in [ExportFormat::Text, ExportFormat::Json, ExportFormat::Jsonl] {
        let records = generate_records(10_000);
        group.throughput(Throughput::Elements(records.len() as u64));
        group.bench_with_input(
            BenchmarkId::new(format.to_string(), records.len()),
            &records,
            |b, records| {
                b.iter(|| {
                    let document = to_string(black_box(records), &descriptor, format).unwrap();
                    black_box(document)
                });
            },
        );
    }
    group.finish();
}

// =============================================================================
// Criterion Configuration
// =============================================================================

criterion_group!(benches, bench_decode_and_normalize, bench_export);

criterion_main!(benches);
