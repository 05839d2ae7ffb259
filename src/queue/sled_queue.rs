use crate::error::{SearchError, SearchResult};
use crate::models::{EntryStatus, IndexOperation, QueueEntry};
use crate::queue::{IndexQueue, RetryPolicy};
use async_trait::async_trait;
use chrono::Utc;
use sled::Db;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Durable queue backend using the sled embedded database.
///
/// Entries are keyed by subject id, so a plain insert is the coalescing
/// overwrite; claims and acknowledgements go through compare-and-swap so
/// concurrent indexer tasks never double-process an entry.
#[derive(Clone)]
pub struct SledQueue {
    db: Arc<Db>,
    entries: sled::Tree,
    policy: RetryPolicy,
}

impl SledQueue {
    /// Open (or create) a queue at the given path
    pub fn open<P: AsRef<Path>>(path: P, policy: RetryPolicy) -> SearchResult<Self> {
        let db = sled::open(&path)
            .map_err(|e| SearchError::Storage(format!("Failed to open sled database: {}", e)))?;

        let entries = db
            .open_tree("index_queue")
            .map_err(|e| SearchError::Storage(format!("Failed to open queue tree: {}", e)))?;

        tracing::info!(path = ?path.as_ref(), "Opened sled index queue");

        Ok(Self {
            db: Arc::new(db),
            entries,
            policy,
        })
    }

    fn serialize(entry: &QueueEntry) -> SearchResult<Vec<u8>> {
        bincode::serialize(entry)
            .map_err(|e| SearchError::Serialization(format!("Failed to serialize entry: {}", e)))
    }

    fn deserialize(bytes: &[u8]) -> SearchResult<QueueEntry> {
        bincode::deserialize(bytes)
            .map_err(|e| SearchError::Serialization(format!("Failed to deserialize entry: {}", e)))
    }

    fn subject_key(subject_id: &Uuid) -> Vec<u8> {
        subject_id.as_bytes().to_vec()
    }

    fn flush(&self) -> SearchResult<()> {
        self.db
            .flush()
            .map_err(|e| SearchError::Storage(format!("Failed to flush queue database: {}", e)))?;
        Ok(())
    }

    /// Locate the raw slot currently holding the entry with this id
    fn find_by_entry_id(&self, id: Uuid) -> SearchResult<Option<(Vec<u8>, sled::IVec, QueueEntry)>> {
        for result in self.entries.iter() {
            let (key, value) = result
                .map_err(|e| SearchError::Storage(format!("Failed to iterate queue: {}", e)))?;
            let entry = Self::deserialize(&value)?;
            if entry.id == id {
                return Ok(Some((key.to_vec(), value, entry)));
            }
        }
        Ok(None)
    }

    /// Swap a slot from `old` to `new`; Ok(false) when the slot changed
    fn swap(&self, key: &[u8], old: &sled::IVec, new: Option<Vec<u8>>) -> SearchResult<bool> {
        let outcome = self
            .entries
            .compare_and_swap(key, Some(old.clone()), new)
            .map_err(|e| SearchError::Storage(format!("Queue compare-and-swap failed: {}", e)))?;
        Ok(outcome.is_ok())
    }
}

#[async_trait]
impl IndexQueue for SledQueue {
    async fn enqueue(&self, subject_id: Uuid, operation: IndexOperation) -> SearchResult<()> {
        let entry = QueueEntry::new(subject_id, operation);
        let value = Self::serialize(&entry)?;

        self.entries
            .insert(Self::subject_key(&subject_id), value)
            .map_err(|e| SearchError::Storage(format!("Failed to enqueue entry: {}", e)))?;
        self.flush()?;

        tracing::debug!(subject_id = %subject_id, operation = %operation, "Queued index operation");
        Ok(())
    }

    async fn claim_batch(&self, max_n: usize) -> SearchResult<Vec<QueueEntry>> {
        let now = Utc::now();

        let mut candidates: Vec<(Vec<u8>, sled::IVec, QueueEntry)> = Vec::new();
        for result in self.entries.iter() {
            let (key, value) = result
                .map_err(|e| SearchError::Storage(format!("Failed to iterate queue: {}", e)))?;
            let entry = Self::deserialize(&value)?;
            if entry.is_claimable(now) {
                candidates.push((key.to_vec(), value, entry));
            }
        }
        candidates.sort_by_key(|(_, _, entry)| entry.enqueued_at);

        let mut claimed = Vec::new();
        for (key, old_value, mut entry) in candidates {
            if claimed.len() >= max_n {
                break;
            }

            entry.status = EntryStatus::Claimed;
            entry.not_before = Some(self.policy.lease_until(now));

            // Lost races (another claimer, or a fresh enqueue) just skip
            if self.swap(&key, &old_value, Some(Self::serialize(&entry)?))? {
                claimed.push(entry);
            }
        }

        if !claimed.is_empty() {
            self.flush()?;
            tracing::debug!(count = claimed.len(), "Claimed queue batch");
        }
        Ok(claimed)
    }

    async fn acknowledge(&self, ids: &[Uuid]) -> SearchResult<usize> {
        let mut removed = 0;
        for id in ids {
            if let Some((key, old_value, _)) = self.find_by_entry_id(*id)? {
                if self.swap(&key, &old_value, None)? {
                    removed += 1;
                }
            }
        }
        if removed > 0 {
            self.flush()?;
        }
        Ok(removed)
    }

    async fn release(&self, id: Uuid, error: &SearchError) -> SearchResult<()> {
        let now = Utc::now();

        let (key, old_value, mut entry) = match self.find_by_entry_id(id)? {
            Some(found) => found,
            None => return Ok(()),
        };

        entry.attempts += 1;
        entry.last_error = Some(error.to_string());

        if !error.is_transient() || entry.attempts >= self.policy.max_attempts {
            entry.status = EntryStatus::Quarantined;
            entry.not_before = None;
            tracing::warn!(
                subject_id = %entry.subject_id,
                attempts = entry.attempts,
                error = %error,
                "Queue entry quarantined"
            );
        } else {
            entry.status = EntryStatus::Pending;
            entry.not_before = Some(self.policy.next_attempt_at(entry.attempts, now));
            tracing::debug!(
                subject_id = %entry.subject_id,
                attempts = entry.attempts,
                "Queue entry released for retry"
            );
        }

        self.swap(&key, &old_value, Some(Self::serialize(&entry)?))?;
        self.flush()?;
        Ok(())
    }

    async fn quarantined(&self) -> SearchResult<Vec<QueueEntry>> {
        let mut parked = Vec::new();
        for result in self.entries.iter() {
            let (_, value) = result
                .map_err(|e| SearchError::Storage(format!("Failed to iterate queue: {}", e)))?;
            let entry = Self::deserialize(&value)?;
            if entry.status == EntryStatus::Quarantined {
                parked.push(entry);
            }
        }
        Ok(parked)
    }

    async fn depth(&self) -> SearchResult<usize> {
        let mut count = 0;
        for result in self.entries.iter() {
            let (_, value) = result
                .map_err(|e| SearchError::Storage(format!("Failed to iterate queue: {}", e)))?;
            let entry = Self::deserialize(&value)?;
            if entry.status != EntryStatus::Quarantined {
                count += 1;
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_queue() -> (SledQueue, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let queue = SledQueue::open(temp_dir.path(), RetryPolicy::default()).unwrap();
        (queue, temp_dir)
    }

    #[tokio::test]
    async fn test_enqueue_and_claim() {
        let (queue, _temp_dir) = create_test_queue();
        let subject = Uuid::new_v4();

        queue.enqueue(subject, IndexOperation::Upsert).await.unwrap();
        let batch = queue.claim_batch(10).await.unwrap();

        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].subject_id, subject);
        assert!(queue.claim_batch(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_coalescing_overwrites_operation() {
        let (queue, _temp_dir) = create_test_queue();
        let subject = Uuid::new_v4();

        queue.enqueue(subject, IndexOperation::Upsert).await.unwrap();
        queue.enqueue(subject, IndexOperation::Delete).await.unwrap();

        assert_eq!(queue.depth().await.unwrap(), 1);
        let batch = queue.claim_batch(10).await.unwrap();
        assert_eq!(batch[0].operation, IndexOperation::Delete);
    }

    #[tokio::test]
    async fn test_acknowledge_clears_entry() {
        let (queue, _temp_dir) = create_test_queue();
        queue
            .enqueue(Uuid::new_v4(), IndexOperation::Upsert)
            .await
            .unwrap();

        let batch = queue.claim_batch(1).await.unwrap();
        assert_eq!(queue.acknowledge(&[batch[0].id]).await.unwrap(), 1);
        assert_eq!(queue.depth().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_persistence_across_reopens() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().to_path_buf();
        let subject = Uuid::new_v4();

        {
            let queue = SledQueue::open(&path, RetryPolicy::default()).unwrap();
            queue.enqueue(subject, IndexOperation::Upsert).await.unwrap();
        }

        {
            let queue = SledQueue::open(&path, RetryPolicy::default()).unwrap();
            assert_eq!(queue.depth().await.unwrap(), 1);
            let batch = queue.claim_batch(1).await.unwrap();
            assert_eq!(batch[0].subject_id, subject);
        }
    }

    #[tokio::test]
    async fn test_permanent_failure_quarantines() {
        let (queue, _temp_dir) = create_test_queue();
        queue
            .enqueue(Uuid::new_v4(), IndexOperation::Upsert)
            .await
            .unwrap();

        let batch = queue.claim_batch(1).await.unwrap();
        queue
            .release(
                batch[0].id,
                &SearchError::InvalidDocument("bad document".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(queue.quarantined().await.unwrap().len(), 1);
        assert_eq!(queue.depth().await.unwrap(), 0);
    }
}
