//! Pending index-operation queue (outbox).
//!
//! Every catalog mutation leaves exactly one live entry per subject here;
//! the batch indexer claims entries oldest-first, applies them to the
//! search engine, and acknowledges the ones that stuck. Failed entries
//! return with exponential backoff and move to quarantine past the retry
//! threshold. The queue is shared mutable state; correctness comes from
//! the backend's atomic coalesce/claim primitives, not in-process locks.

mod memory;
mod sled_queue;

pub use memory::MemoryQueue;
pub use sled_queue::SledQueue;

use crate::config::{QueueBackend, QueueConfig};
use crate::error::{SearchError, SearchResult};
use crate::models::{IndexOperation, QueueEntry};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Retry and claim tuning shared by all queue backends
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Failures tolerated before an entry is quarantined
    pub max_attempts: u32,

    /// First retry delay; doubles per attempt
    pub backoff_base_ms: u64,

    /// Upper bound for the computed backoff
    pub backoff_cap_ms: u64,

    /// How long a claim stays exclusive before the entry is reclaimable
    pub claim_lease_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_base_ms: 1_000,
            backoff_cap_ms: 300_000,
            claim_lease_secs: 120,
        }
    }
}

impl RetryPolicy {
    /// Backoff deadline for an entry that has now failed `attempts` times
    pub fn next_attempt_at(&self, attempts: u32, now: DateTime<Utc>) -> DateTime<Utc> {
        let exp = attempts.saturating_sub(1).min(20);
        let delay_ms = self
            .backoff_base_ms
            .saturating_mul(1u64 << exp)
            .min(self.backoff_cap_ms);
        now + ChronoDuration::milliseconds(delay_ms as i64)
    }

    /// Lease expiry for an entry claimed at `now`
    pub fn lease_until(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + ChronoDuration::seconds(self.claim_lease_secs as i64)
    }
}

impl From<&QueueConfig> for RetryPolicy {
    fn from(config: &QueueConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            backoff_base_ms: config.backoff_base_ms,
            backoff_cap_ms: config.backoff_cap_ms,
            claim_lease_secs: config.claim_lease_secs,
        }
    }
}

/// Durable, per-subject-coalesced queue of pending index operations
#[async_trait]
pub trait IndexQueue: Send + Sync {
    /// Record an index intent for a subject.
    ///
    /// Coalescing: if a live entry exists for the subject it is overwritten
    /// (operation, timestamp, fresh id) and its failure history resets.
    /// This also revives quarantined subjects.
    async fn enqueue(&self, subject_id: Uuid, operation: IndexOperation) -> SearchResult<()>;

    /// Atomically claim up to `max_n` oldest-first claimable entries.
    ///
    /// Claimed entries are invisible to other claimers until acknowledged,
    /// released, or their lease expires.
    async fn claim_batch(&self, max_n: usize) -> SearchResult<Vec<QueueEntry>>;

    /// Remove processed entries by entry id.
    ///
    /// An entry re-enqueued after the claim carries a new id and is left in
    /// place, so the later mutation is never lost. Returns how many entries
    /// were actually removed.
    async fn acknowledge(&self, ids: &[Uuid]) -> SearchResult<usize>;

    /// Return a claimed entry after a failure.
    ///
    /// Transient errors requeue with exponential backoff until
    /// `max_attempts`, then quarantine; permanent errors quarantine
    /// immediately.
    async fn release(&self, id: Uuid, error: &SearchError) -> SearchResult<()>;

    /// Entries parked after repeated or permanent failures
    async fn quarantined(&self) -> SearchResult<Vec<QueueEntry>>;

    /// Outstanding (pending + claimed) entry count
    async fn depth(&self) -> SearchResult<usize>;
}

/// Create a queue backend from configuration
pub fn create_queue(config: &QueueConfig) -> SearchResult<Arc<dyn IndexQueue>> {
    let policy = RetryPolicy::from(config);

    match config.backend {
        QueueBackend::Memory => {
            tracing::info!("Initializing in-memory index queue");
            Ok(Arc::new(MemoryQueue::new(policy)))
        }
        QueueBackend::Sled => {
            let path = config.path.as_ref().ok_or_else(|| {
                SearchError::Configuration(
                    "Sled queue backend requires 'path' configuration".to_string(),
                )
            })?;

            tracing::info!(path = ?path, "Initializing sled index queue");
            Ok(Arc::new(SledQueue::open(path, policy)?))
        }
    }
}
