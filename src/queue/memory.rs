use crate::error::{SearchError, SearchResult};
use crate::models::{EntryStatus, IndexOperation, QueueEntry};
use crate::queue::{IndexQueue, RetryPolicy};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// In-memory queue backend for development and tests.
///
/// One map slot per subject enforces the coalescing invariant
/// structurally; claim transitions happen under the slot's shard lock.
#[derive(Clone)]
pub struct MemoryQueue {
    entries: Arc<DashMap<Uuid, QueueEntry>>,
    policy: RetryPolicy,
}

impl MemoryQueue {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            policy,
        }
    }

    /// Find the subject currently holding the entry with this id
    fn subject_of(&self, id: Uuid) -> Option<Uuid> {
        self.entries
            .iter()
            .find(|e| e.value().id == id)
            .map(|e| *e.key())
    }
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

#[async_trait]
impl IndexQueue for MemoryQueue {
    async fn enqueue(&self, subject_id: Uuid, operation: IndexOperation) -> SearchResult<()> {
        let entry = QueueEntry::new(subject_id, operation);
        self.entries.insert(subject_id, entry);

        tracing::debug!(subject_id = %subject_id, operation = %operation, "Queued index operation");
        Ok(())
    }

    async fn claim_batch(&self, max_n: usize) -> SearchResult<Vec<QueueEntry>> {
        let now = Utc::now();

        // Snapshot claimable candidates oldest-first, then re-check each
        // under its shard lock so two claimers never take the same entry.
        let mut candidates: Vec<(chrono::DateTime<Utc>, Uuid, Uuid)> = self
            .entries
            .iter()
            .filter(|e| e.value().is_claimable(now))
            .map(|e| (e.value().enqueued_at, *e.key(), e.value().id))
            .collect();
        candidates.sort_by_key(|(enqueued_at, _, _)| *enqueued_at);

        let mut claimed = Vec::new();
        for (_, subject_id, entry_id) in candidates {
            if claimed.len() >= max_n {
                break;
            }

            if let Some(mut slot) = self.entries.get_mut(&subject_id) {
                if slot.id == entry_id && slot.is_claimable(now) {
                    slot.status = EntryStatus::Claimed;
                    slot.not_before = Some(self.policy.lease_until(now));
                    claimed.push(slot.clone());
                }
            }
        }

        if !claimed.is_empty() {
            tracing::debug!(count = claimed.len(), "Claimed queue batch");
        }
        Ok(claimed)
    }

    async fn acknowledge(&self, ids: &[Uuid]) -> SearchResult<usize> {
        let mut removed = 0;
        for id in ids {
            if let Some(subject_id) = self.subject_of(*id) {
                if self
                    .entries
                    .remove_if(&subject_id, |_, entry| entry.id == *id)
                    .is_some()
                {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    async fn release(&self, id: Uuid, error: &SearchError) -> SearchResult<()> {
        let now = Utc::now();
        let subject_id = match self.subject_of(id) {
            Some(s) => s,
            // Entry was re-enqueued or acknowledged meanwhile
            None => return Ok(()),
        };

        if let Some(mut slot) = self.entries.get_mut(&subject_id) {
            if slot.id != id {
                return Ok(());
            }

            slot.attempts += 1;
            slot.last_error = Some(error.to_string());

            if !error.is_transient() || slot.attempts >= self.policy.max_attempts {
                slot.status = EntryStatus::Quarantined;
                slot.not_before = None;
                tracing::warn!(
                    subject_id = %subject_id,
                    attempts = slot.attempts,
                    error = %error,
                    "Queue entry quarantined"
                );
            } else {
                slot.status = EntryStatus::Pending;
                slot.not_before = Some(self.policy.next_attempt_at(slot.attempts, now));
                tracing::debug!(
                    subject_id = %subject_id,
                    attempts = slot.attempts,
                    "Queue entry released for retry"
                );
            }
        }

        Ok(())
    }

    async fn quarantined(&self) -> SearchResult<Vec<QueueEntry>> {
        Ok(self
            .entries
            .iter()
            .filter(|e| e.value().status == EntryStatus::Quarantined)
            .map(|e| e.value().clone())
            .collect())
    }

    async fn depth(&self) -> SearchResult<usize> {
        Ok(self
            .entries
            .iter()
            .filter(|e| e.value().status != EntryStatus::Quarantined)
            .count())
    }
}
