// Document mapper performance benchmarks
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use tracker_search::mapper::map_record;
use tracker_search::models::TorrentRecord;
use uuid::Uuid;

fn full_record(i: usize) -> TorrentRecord {
    let mut record = TorrentRecord::new(
        format!("  The.Expanse.S0{i}.2160p.REMUX  "),
        "A1B2C3D4E5F6A1B2C3D4E5F6A1B2C3D4E5F6A1B2",
        "TV",
        "uploader-prime",
        Uuid::new_v4(),
        42 * 1024 * 1024 * 1024,
    )
    .with_tags(vec!["Sci-Fi", "REMUX", "sci-fi", "  hdr  "])
    .with_media(
        "Video",
        Some("2160p".to_string()),
        Some("HEVC".to_string()),
        Some("Remux".to_string()),
    )
    .with_swarm(1500, 90, 12000);
    record.description = Some("Complete season remux with HDR10.".to_string());
    record.year = Some(2020 + (i as i32 % 5));
    record.rating = Some(8.7);
    record
}

fn bench_map_single(c: &mut Criterion) {
    let record = full_record(1);
    c.bench_function("map_record_full", |b| {
        b.iter(|| map_record(black_box(&record)));
    });
}

fn bench_map_batch(c: &mut Criterion) {
    let records: Vec<TorrentRecord> = (0..1_000).map(full_record).collect();
    let mut group = c.benchmark_group("map_record_batch");
    group.throughput(Throughput::Elements(records.len() as u64));
    group.bench_function("1000_records", |b| {
        b.iter(|| {
            records
                .iter()
                .map(|record| map_record(black_box(record)))
                .count()
        });
    });
    group.finish();
}

criterion_group!(benches, bench_map_single, bench_map_batch);
criterion_main!(benches);
