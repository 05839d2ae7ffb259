use crate::catalog::CatalogStore;
use crate::error::SearchResult;
use crate::models::{IndexOperation, TorrentRecord};
use crate::queue::IndexQueue;
use std::sync::Arc;
use uuid::Uuid;

/// Change-capturing writer over the catalog.
///
/// Every successful commit leaves a matching entry in the index queue.
/// When the enqueue fails the catalog change is rolled back, so the two
/// never diverge: either both happened or neither did.
pub struct CatalogWriter {
    store: Arc<dyn CatalogStore>,
    queue: Arc<dyn IndexQueue>,
}

impl CatalogWriter {
    pub fn new(store: Arc<dyn CatalogStore>, queue: Arc<dyn IndexQueue>) -> Self {
        Self { store, queue }
    }

    /// Insert or update a record and queue it for indexing
    pub async fn commit_upsert(&self, record: TorrentRecord) -> SearchResult<()> {
        let id = record.id;
        let previous = self.store.put(record).await?;

        if let Err(e) = self.queue.enqueue(id, IndexOperation::Upsert).await {
            // Restore the catalog to its pre-commit state
            match previous {
                Some(prior) => {
                    self.store.put(prior).await?;
                }
                None => {
                    self.store.remove(id).await?;
                }
            }
            tracing::error!(subject_id = %id, error = %e, "Rolled back catalog upsert");
            return Err(e);
        }

        Ok(())
    }

    /// Remove a record and queue its deletion from the index
    pub async fn commit_delete(&self, id: Uuid) -> SearchResult<()> {
        let previous = self.store.remove(id).await?;

        if let Err(e) = self.queue.enqueue(id, IndexOperation::Delete).await {
            if let Some(prior) = previous {
                self.store.put(prior).await?;
            }
            tracing::error!(subject_id = %id, error = %e, "Rolled back catalog delete");
            return Err(e);
        }

        Ok(())
    }

    pub fn store(&self) -> Arc<dyn CatalogStore> {
        Arc::clone(&self.store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::error::SearchError;
    use crate::models::QueueEntry;
    use crate::queue::MemoryQueue;
    use async_trait::async_trait;

    struct FailingQueue;

    #[async_trait]
    impl IndexQueue for FailingQueue {
        async fn enqueue(&self, _subject_id: Uuid, _operation: IndexOperation) -> SearchResult<()> {
            Err(SearchError::Storage("queue unavailable".to_string()))
        }

        async fn claim_batch(&self, _max_n: usize) -> SearchResult<Vec<QueueEntry>> {
            Ok(Vec::new())
        }

        async fn acknowledge(&self, _ids: &[Uuid]) -> SearchResult<usize> {
            Ok(0)
        }

        async fn release(&self, _id: Uuid, _error: &SearchError) -> SearchResult<()> {
            Ok(())
        }

        async fn quarantined(&self) -> SearchResult<Vec<QueueEntry>> {
            Ok(Vec::new())
        }

        async fn depth(&self) -> SearchResult<usize> {
            Ok(0)
        }
    }

    fn sample_record() -> TorrentRecord {
        TorrentRecord::new(
            "Ubuntu 24.04 ISO",
            "aabbccddee0011223344556677889900aabbccdd",
            "Software",
            "uploader",
            Uuid::new_v4(),
            2_000_000_000,
        )
    }

    #[tokio::test]
    async fn test_upsert_commits_and_enqueues() {
        let store = Arc::new(InMemoryCatalog::new());
        let queue = Arc::new(MemoryQueue::default());
        let writer = CatalogWriter::new(store.clone(), queue.clone());

        let record = sample_record();
        let id = record.id;
        writer.commit_upsert(record).await.unwrap();

        assert!(store.get(id).await.unwrap().is_some());
        assert_eq!(queue.depth().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_enqueue_rolls_back_insert() {
        let store = Arc::new(InMemoryCatalog::new());
        let writer = CatalogWriter::new(store.clone(), Arc::new(FailingQueue));

        let record = sample_record();
        let id = record.id;
        assert!(writer.commit_upsert(record).await.is_err());
        assert!(store.get(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_enqueue_restores_previous_version() {
        let store = Arc::new(InMemoryCatalog::new());
        let good_writer = CatalogWriter::new(store.clone(), Arc::new(MemoryQueue::default()));

        let mut record = sample_record();
        let id = record.id;
        good_writer.commit_upsert(record.clone()).await.unwrap();

        record.name = "Renamed".to_string();
        let bad_writer = CatalogWriter::new(store.clone(), Arc::new(FailingQueue));
        assert!(bad_writer.commit_upsert(record).await.is_err());

        let current = store.get(id).await.unwrap().unwrap();
        assert_eq!(current.name, "Ubuntu 24.04 ISO");
    }

    #[tokio::test]
    async fn test_failed_enqueue_restores_deleted_record() {
        let store = Arc::new(InMemoryCatalog::new());
        let good_writer = CatalogWriter::new(store.clone(), Arc::new(MemoryQueue::default()));

        let record = sample_record();
        let id = record.id;
        good_writer.commit_upsert(record).await.unwrap();

        let bad_writer = CatalogWriter::new(store.clone(), Arc::new(FailingQueue));
        assert!(bad_writer.commit_delete(id).await.is_err());
        assert!(store.get(id).await.unwrap().is_some());
    }
}
