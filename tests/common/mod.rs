//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use std::sync::Arc;

use tracker_search::catalog::InMemoryCatalog;
use tracker_search::config::Config;
use tracker_search::engine::MemoryEngine;
use tracker_search::history::InMemoryHistory;
use tracker_search::models::TorrentRecord;
use tracker_search::queue::{MemoryQueue, RetryPolicy};
use tracker_search::service::SearchService;
use uuid::Uuid;

/// Initialize test logging; later calls are no-ops.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tracker_search=debug".into());
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Memory-backed stack with handles to every backend for assertions.
pub struct Platform {
    pub service: SearchService,
    pub engine: Arc<MemoryEngine>,
    pub catalog: Arc<InMemoryCatalog>,
    pub history: Arc<InMemoryHistory>,
    pub queue: Arc<MemoryQueue>,
}

pub async fn memory_platform() -> Platform {
    memory_platform_with(Config::default()).await
}

pub async fn memory_platform_with(config: Config) -> Platform {
    let engine = Arc::new(MemoryEngine::new());
    let catalog = Arc::new(InMemoryCatalog::new());
    let history = Arc::new(InMemoryHistory::new());
    let queue = Arc::new(MemoryQueue::new(RetryPolicy::default()));
    let service = SearchService::start(
        &config,
        engine.clone(),
        queue.clone(),
        catalog.clone(),
        history.clone(),
    )
    .await
    .expect("service should start over memory backends");
    Platform {
        service,
        engine,
        catalog,
        history,
        queue,
    }
}

/// Tick the indexer until the queue stops yielding claims.
pub async fn drain(service: &SearchService) {
    let indexer = service.indexer();
    loop {
        let summary = indexer.tick().await.expect("indexer tick");
        if summary.claimed == 0 {
            break;
        }
    }
}

/// Catalog record with the fields the suites care about.
pub fn record(name: &str, category: &str, seeders: i32, tags: &[&str]) -> TorrentRecord {
    TorrentRecord::new(
        name,
        "deadbeef01",
        category,
        "alice",
        Uuid::new_v4(),
        4 * 1024 * 1024,
    )
    .with_tags(tags.to_vec())
    .with_swarm(seeders, 3, 12)
}
