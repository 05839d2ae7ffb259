//! End-to-end outbox pipeline: catalog mutations flow through the queue
//! and batch indexer into the search engine.

mod common;

use common::{drain, init_tracing, memory_platform, record};
use tracker_search::catalog::CatalogStore;
use tracker_search::engine::SearchEngine;
use tracker_search::models::EntryStatus;
use tracker_search::query::SearchRequest;
use tracker_search::queue::IndexQueue;

#[tokio::test]
async fn test_upsert_flows_from_catalog_to_search() {
    init_tracing();
    let platform = memory_platform().await;
    let writer = platform.service.writer();

    let torrent = record("Ubuntu 24.04 Desktop", "Software", 120, &["linux", "iso"]);
    let id = torrent.id;
    writer.commit_upsert(torrent).await.unwrap();
    assert_eq!(platform.service.queue_depth().await.unwrap(), 1);

    drain(&platform.service).await;
    let outcome = platform
        .service
        .search(&SearchRequest::new("ubuntu"))
        .await
        .unwrap();
    assert_eq!(outcome.results.total, 1);
    assert_eq!(outcome.results.hits[0].document.id, id);

    writer.commit_delete(id).await.unwrap();
    drain(&platform.service).await;
    let outcome = platform
        .service
        .search(&SearchRequest::new("ubuntu"))
        .await
        .unwrap();
    assert_eq!(outcome.results.total, 0);
}

#[tokio::test]
async fn test_queued_mutations_coalesce_per_subject() {
    let platform = memory_platform().await;
    let writer = platform.service.writer();

    let torrent = record("Coalesced Release", "Software", 5, &[]);
    let id = torrent.id;
    writer.commit_upsert(torrent.clone()).await.unwrap();
    writer.commit_delete(id).await.unwrap();
    assert_eq!(platform.service.queue_depth().await.unwrap(), 1);

    drain(&platform.service).await;
    assert!(platform.engine.get_document(id).await.unwrap().is_none());

    // Deleting and re-uploading before a tick leaves the upsert in place.
    writer.commit_upsert(torrent.clone()).await.unwrap();
    drain(&platform.service).await;
    writer.commit_delete(id).await.unwrap();
    writer.commit_upsert(torrent).await.unwrap();
    assert_eq!(platform.service.queue_depth().await.unwrap(), 1);

    drain(&platform.service).await;
    assert!(platform.engine.get_document(id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_eventual_consistency_after_mixed_mutations() {
    let platform = memory_platform().await;
    let writer = platform.service.writer();

    let mut ids = Vec::new();
    for i in 0..10 {
        let torrent = record(&format!("Release {i}"), "Software", i, &["batch"]);
        ids.push(torrent.id);
        writer.commit_upsert(torrent).await.unwrap();
    }
    drain(&platform.service).await;

    for (i, id) in ids.iter().enumerate() {
        if i % 2 == 0 {
            let mut updated = record(
                &format!("Release {i} Remastered"),
                "Software",
                100 + i as i32,
                &["batch"],
            );
            updated.id = *id;
            writer.commit_upsert(updated).await.unwrap();
        } else if i % 3 == 0 {
            writer.commit_delete(*id).await.unwrap();
        }
    }
    drain(&platform.service).await;

    let expected = platform.catalog.count().await.unwrap() as u64;
    let outcome = platform.service.search(&SearchRequest::new("")).await.unwrap();
    assert_eq!(outcome.results.total, expected);

    for id in ids {
        let in_catalog = platform.catalog.get(id).await.unwrap();
        let in_index = platform.engine.get_document(id).await.unwrap();
        match in_catalog {
            Some(record) => {
                let document = in_index.expect("catalog record should be indexed");
                assert_eq!(document.name, record.name);
            }
            None => assert!(in_index.is_none(), "deleted record should leave the index"),
        }
    }
}

#[tokio::test]
async fn test_invalid_record_quarantines_without_blocking_flow() {
    let platform = memory_platform().await;
    let writer = platform.service.writer();

    let bad = record("   ", "Software", 0, &[]);
    let bad_id = bad.id;
    let good = record("Good Release", "Software", 10, &[]);
    let good_id = good.id;
    writer.commit_upsert(bad).await.unwrap();
    writer.commit_upsert(good).await.unwrap();
    drain(&platform.service).await;

    assert!(platform.engine.get_document(good_id).await.unwrap().is_some());
    assert!(platform.engine.get_document(bad_id).await.unwrap().is_none());

    let quarantined = platform.queue.quarantined().await.unwrap();
    assert_eq!(quarantined.len(), 1);
    assert_eq!(quarantined[0].subject_id, bad_id);
    assert_eq!(quarantined[0].status, EntryStatus::Quarantined);
}

#[tokio::test]
async fn test_full_reindex_restores_cleared_index() {
    let platform = memory_platform().await;
    let writer = platform.service.writer();
    for i in 0..3 {
        writer
            .commit_upsert(record(&format!("Seed {i}"), "Software", i, &[]))
            .await
            .unwrap();
    }
    drain(&platform.service).await;

    platform.service.clear_index().await.unwrap();
    let outcome = platform.service.search(&SearchRequest::new("")).await.unwrap();
    assert_eq!(outcome.results.total, 0);

    let total = platform.service.trigger_reindex().await.unwrap();
    assert_eq!(total, 3);
    let outcome = platform.service.search(&SearchRequest::new("")).await.unwrap();
    assert_eq!(outcome.results.total, 3);
}
