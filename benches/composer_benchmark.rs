// Query composition and filter evaluation benchmarks
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tracker_search::mapper::map_record;
use tracker_search::models::TorrentRecord;
use tracker_search::query::{
    FilterCondition, FilterNode, QueryLimits, SearchRequest, SortKey, SortSpec,
};
use uuid::Uuid;

fn wide_filter() -> FilterNode {
    FilterNode::condition(FilterCondition::Category("movies".into()))
        .and(FilterNode::condition(FilterCondition::SizeRange {
            min: Some(1024 * 1024 * 1024),
            max: Some(60 * 1024 * 1024 * 1024),
        }))
        .and(FilterNode::condition(FilterCondition::SeedersRange {
            min: Some(5),
            max: None,
        }))
        .and(FilterNode::tags_any(["remux", "bluray", "web-dl", "hdr"]))
}

fn filtered_request() -> SearchRequest {
    SearchRequest::new("inception remux 2160p")
        .with_filter(wide_filter())
        .with_sort(SortSpec::desc(SortKey::Seeders))
        .with_sort(SortSpec::desc(SortKey::UploadedAt))
        .with_facets(["category", "resolution", "quality", "tags"])
        .with_page(40, 20)
}

fn bench_compose(c: &mut Criterion) {
    let limits = QueryLimits::default();
    let request = filtered_request();
    c.bench_function("compose_filtered_request", |b| {
        b.iter(|| black_box(&request).compose(black_box(&limits)).unwrap());
    });
}

fn bench_filter_matches(c: &mut Criterion) {
    let filter = wide_filter();
    let record = TorrentRecord::new(
        "Inception 2010 2160p Remux",
        "a1b2c3d4",
        "Movies",
        "alice",
        Uuid::new_v4(),
        30 * 1024 * 1024 * 1024,
    )
    .with_tags(vec!["remux", "scifi", "hdr"])
    .with_swarm(120, 10, 900);
    let document = map_record(&record);

    c.bench_function("filter_tree_matches", |b| {
        b.iter(|| filter.matches(black_box(&document)));
    });
}

criterion_group!(benches, bench_compose, bench_filter_matches);
criterion_main!(benches);
