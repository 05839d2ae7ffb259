use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Index operation recorded for a catalog subject
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IndexOperation {
    /// Create or replace the subject's document
    Upsert,

    /// Remove the subject's document
    Delete,
}

/// Processing state of a queue entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntryStatus {
    /// Waiting to be claimed
    Pending,

    /// Claimed by an indexer instance
    Claimed,

    /// Failed past the retry threshold; kept for inspection
    Quarantined,
}

/// A pending index operation for one catalog subject.
///
/// At most one live entry exists per subject; a later enqueue overwrites
/// the operation and timestamp instead of adding a second entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Entry identifier
    pub id: Uuid,

    /// Catalog subject this entry refers to
    pub subject_id: Uuid,

    /// What the indexer should do for the subject
    pub operation: IndexOperation,

    /// When the entry was (last) enqueued
    pub enqueued_at: DateTime<Utc>,

    /// Failed processing attempts so far
    pub attempts: u32,

    /// For pending entries, the retry backoff deadline; for claimed
    /// entries, the claim lease expiry. None means immediately claimable.
    pub not_before: Option<DateTime<Utc>>,

    /// Current processing state
    pub status: EntryStatus,

    /// Message from the most recent failure
    pub last_error: Option<String>,
}

impl QueueEntry {
    /// Create a fresh pending entry
    pub fn new(subject_id: Uuid, operation: IndexOperation) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject_id,
            operation,
            enqueued_at: Utc::now(),
            attempts: 0,
            not_before: None,
            status: EntryStatus::Pending,
            last_error: None,
        }
    }

    /// Whether this entry may be claimed at `now`.
    ///
    /// A pending entry is claimable once its backoff has elapsed. A claimed
    /// entry becomes claimable again when its claim lease expires, so a
    /// crashed worker cannot strand it.
    pub fn is_claimable(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            EntryStatus::Pending => self.not_before.map_or(true, |t| t <= now),
            EntryStatus::Claimed => self.not_before.map_or(false, |t| t <= now),
            EntryStatus::Quarantined => false,
        }
    }
}
