// In-memory engine query benchmarks
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tokio::runtime::Runtime;
use tracker_search::engine::{MemoryEngine, SearchEngine};
use tracker_search::mapper::map_record;
use tracker_search::models::TorrentRecord;
use tracker_search::query::{
    ComposedQuery, FilterCondition, FilterNode, QueryLimits, SearchRequest,
};
use uuid::Uuid;

const WORDS: &[&str] = &[
    "ubuntu", "inception", "remux", "live", "concert", "season", "portable", "collection",
];
const CATEGORIES: &[&str] = &["Movies", "TV", "Music", "Software", "Games"];

async fn seeded_engine(size: usize) -> Arc<MemoryEngine> {
    let engine = Arc::new(MemoryEngine::new());
    let documents: Vec<_> = (0..size)
        .map(|i| {
            let record = TorrentRecord::new(
                format!("Release {i} {}", WORDS[i % WORDS.len()]),
                "a1b2c3d4",
                CATEGORIES[i % CATEGORIES.len()],
                "alice",
                Uuid::new_v4(),
                (i as i64 + 1) * 1024 * 1024,
            )
            .with_tags(vec![WORDS[(i + 3) % WORDS.len()]])
            .with_swarm((i % 500) as i32, 5, 50);
            map_record(&record)
        })
        .collect();
    engine.upsert_documents(&documents).await.unwrap();
    engine
}

fn composed(request: SearchRequest) -> ComposedQuery {
    request.compose(&QueryLimits::default()).unwrap()
}

fn bench_term_query(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("memory_engine_term_query");
    for size in [1_000usize, 10_000] {
        let engine = rt.block_on(seeded_engine(size));
        let query = composed(SearchRequest::new("ubuntu"));
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.to_async(&rt).iter(|| {
                let engine = engine.clone();
                let query = query.clone();
                async move { engine.query(&query).await.unwrap() }
            });
        });
    }
    group.finish();
}

fn bench_filtered_query(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let engine = rt.block_on(seeded_engine(10_000));
    let query = composed(
        SearchRequest::new("")
            .with_filter(
                FilterNode::condition(FilterCondition::Category("movies".into())).and(
                    FilterNode::condition(FilterCondition::SeedersRange {
                        min: Some(100),
                        max: None,
                    }),
                ),
            )
            .with_facets(["category", "tags"]),
    );

    c.bench_function("memory_engine_filtered_faceted_query", |b| {
        b.to_async(&rt).iter(|| {
            let engine = engine.clone();
            let query = query.clone();
            async move { engine.query(&query).await.unwrap() }
        });
    });
}

criterion_group!(benches, bench_term_query, bench_filtered_query);
criterion_main!(benches);
