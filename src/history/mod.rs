//! Search history persistence.
//!
//! Analytics reports and suggestion sources are pure reads over this
//! store. Writes are append-only; the retention job prunes old rows.

mod memory;

pub use memory::InMemoryHistory;

use crate::error::SearchResult;
use crate::models::{AbObservation, ClickEvent, SearchRecord, TimeWindow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Append-only store of searches, clicks and A/B observations
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Record an executed search. When the record carries a user id it
    /// also joins that user's bounded recent history.
    async fn append_search(&self, record: SearchRecord) -> SearchResult<()>;

    /// Record a result click. Fails with `NotFound` when the referenced
    /// search was never recorded.
    async fn append_click(&self, event: ClickEvent) -> SearchResult<()>;

    async fn append_observation(&self, observation: AbObservation) -> SearchResult<()>;

    /// Searches whose `created_at` falls inside the window, oldest first
    async fn searches_in(&self, window: TimeWindow) -> SearchResult<Vec<SearchRecord>>;

    /// Clicks whose `created_at` falls inside the window, oldest first
    async fn clicks_in(&self, window: TimeWindow) -> SearchResult<Vec<ClickEvent>>;

    /// Every observation for one experiment, oldest first
    async fn observations_for(&self, test_name: &str) -> SearchResult<Vec<AbObservation>>;

    /// A user's recent searches, newest first, bounded by the store
    async fn recent_for_user(&self, user_id: Uuid) -> SearchResult<Vec<SearchRecord>>;

    /// Drop rows older than the cutoff; returns how many went away
    async fn prune_before(&self, cutoff: DateTime<Utc>) -> SearchResult<usize>;
}
