//! Transactional catalog backing the search index.
//!
//! The catalog is the source of truth for torrent records. All writes go
//! through [`CatalogWriter`], which pairs each committed change with an
//! index queue entry so the search index converges on the catalog state.

mod writer;

pub use writer::CatalogWriter;

use crate::error::SearchResult;
use crate::models::TorrentRecord;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Storage abstraction over the torrent catalog
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Fetch a single record by id
    async fn get(&self, id: Uuid) -> SearchResult<Option<TorrentRecord>>;

    /// Insert or replace a record, returning the previous value if any
    async fn put(&self, record: TorrentRecord) -> SearchResult<Option<TorrentRecord>>;

    /// Remove a record, returning it if it existed
    async fn remove(&self, id: Uuid) -> SearchResult<Option<TorrentRecord>>;

    /// Page through all records in a stable order
    async fn page(&self, offset: usize, limit: usize) -> SearchResult<Vec<TorrentRecord>>;

    /// Total number of records
    async fn count(&self) -> SearchResult<usize>;
}

/// In-memory catalog store
pub struct InMemoryCatalog {
    records: Arc<DashMap<Uuid, TorrentRecord>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self {
            records: Arc::new(DashMap::new()),
        }
    }
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn get(&self, id: Uuid) -> SearchResult<Option<TorrentRecord>> {
        Ok(self.records.get(&id).map(|r| r.clone()))
    }

    async fn put(&self, record: TorrentRecord) -> SearchResult<Option<TorrentRecord>> {
        Ok(self.records.insert(record.id, record))
    }

    async fn remove(&self, id: Uuid) -> SearchResult<Option<TorrentRecord>> {
        Ok(self.records.remove(&id).map(|(_, r)| r))
    }

    async fn page(&self, offset: usize, limit: usize) -> SearchResult<Vec<TorrentRecord>> {
        let mut all: Vec<TorrentRecord> = self.records.iter().map(|r| r.clone()).collect();
        all.sort_by_key(|r| (r.uploaded_at, r.id));
        Ok(all.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&self) -> SearchResult<usize> {
        Ok(self.records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record(name: &str) -> TorrentRecord {
        TorrentRecord::new(
            name,
            "aabbccddee0011223344556677889900aabbccdd",
            "Movies",
            "uploader",
            Uuid::new_v4(),
            1_000_000,
        )
    }

    #[tokio::test]
    async fn test_put_get_remove() {
        let catalog = InMemoryCatalog::new();
        let record = sample_record("Test Torrent");
        let id = record.id;

        assert!(catalog.put(record).await.unwrap().is_none());
        assert_eq!(catalog.get(id).await.unwrap().unwrap().name, "Test Torrent");
        assert!(catalog.remove(id).await.unwrap().is_some());
        assert!(catalog.get(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_page_is_stable() {
        let catalog = InMemoryCatalog::new();
        for i in 0..5 {
            catalog.put(sample_record(&format!("Torrent {}", i))).await.unwrap();
        }

        let first = catalog.page(0, 3).await.unwrap();
        let second = catalog.page(3, 3).await.unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(second.len(), 2);
        assert_eq!(catalog.count().await.unwrap(), 5);

        let mut seen: Vec<Uuid> = first.iter().chain(second.iter()).map(|r| r.id).collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 5);
    }
}
