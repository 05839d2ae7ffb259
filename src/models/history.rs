use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Half-open reporting window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Window covering the last `hours` hours, ending now
    pub fn last_hours(hours: i64) -> Self {
        let end = Utc::now();
        Self {
            start: end - Duration::hours(hours),
            end,
        }
    }

    /// Window covering the last `days` days, ending now
    pub fn last_days(days: i64) -> Self {
        let end = Utc::now();
        Self {
            start: end - Duration::days(days),
            end,
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

/// One executed search, recorded after the engine responded.
///
/// Immutable once appended; clicks and A/B observations reference it by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRecord {
    /// Search identifier handed back to the caller
    pub id: Uuid,

    /// Searching user, if authenticated
    pub user_id: Option<Uuid>,

    /// The raw query text
    pub query_text: String,

    /// Snapshot of the applied filters
    pub filters: Option<serde_json::Value>,

    /// Number of hits returned
    pub result_count: usize,

    /// End-to-end latency in milliseconds
    pub latency_ms: u64,

    /// When the search ran
    pub created_at: DateTime<Utc>,
}

impl SearchRecord {
    /// Create a record for a search that just executed
    pub fn new(
        user_id: Option<Uuid>,
        query_text: impl Into<String>,
        filters: Option<serde_json::Value>,
        result_count: usize,
        latency_ms: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            query_text: query_text.into(),
            filters,
            result_count,
            latency_ms,
            created_at: Utc::now(),
        }
    }
}

/// A result click attributed to a recorded search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickEvent {
    /// Event identifier
    pub id: Uuid,

    /// The search this click belongs to
    pub search_id: Uuid,

    /// Clicking user, if authenticated
    pub user_id: Option<Uuid>,

    /// Clicked catalog subject
    pub subject_id: Uuid,

    /// 1-indexed position of the hit in the result list
    pub position: u32,

    /// When the click happened
    pub created_at: DateTime<Utc>,
}

impl ClickEvent {
    /// Create a click event for a recorded search
    pub fn new(search_id: Uuid, user_id: Option<Uuid>, subject_id: Uuid, position: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            search_id,
            user_id,
            subject_id,
            position,
            created_at: Utc::now(),
        }
    }
}

/// One observation inside an A/B experiment arm.
///
/// Variant assignment happens outside this crate; the observation only
/// records which arm served the search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbObservation {
    /// Observation identifier
    pub id: Uuid,

    /// Observed user, if authenticated
    pub user_id: Option<Uuid>,

    /// Experiment name
    pub test_name: String,

    /// Arm that served this search
    pub variant: String,

    /// The query text served
    pub query_text: String,

    /// Number of hits returned
    pub result_count: usize,

    /// When the observation was taken
    pub created_at: DateTime<Utc>,
}

impl AbObservation {
    /// Record an observation for an experiment arm
    pub fn new(
        user_id: Option<Uuid>,
        test_name: impl Into<String>,
        variant: impl Into<String>,
        query_text: impl Into<String>,
        result_count: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            test_name: test_name.into(),
            variant: variant.into(),
            query_text: query_text.into(),
            result_count,
            created_at: Utc::now(),
        }
    }
}
