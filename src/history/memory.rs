use crate::error::{SearchError, SearchResult};
use crate::history::HistoryStore;
use crate::models::{AbObservation, ClickEvent, SearchRecord, TimeWindow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::VecDeque;
use uuid::Uuid;

const DEFAULT_RECENT_LIMIT: usize = 20;

/// In-memory history backend over concurrent maps.
///
/// Windowed reads scan and sort, which is fine at the volumes a single
/// deployment accumulates between retention prunes.
pub struct InMemoryHistory {
    searches: DashMap<Uuid, SearchRecord>,
    clicks: DashMap<Uuid, ClickEvent>,
    observations: DashMap<Uuid, AbObservation>,
    recents: DashMap<Uuid, VecDeque<SearchRecord>>,
    recent_limit: usize,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::with_recent_limit(DEFAULT_RECENT_LIMIT)
    }

    /// Cap on per-user recent history; the oldest entry is evicted first
    pub fn with_recent_limit(recent_limit: usize) -> Self {
        Self {
            searches: DashMap::new(),
            clicks: DashMap::new(),
            observations: DashMap::new(),
            recents: DashMap::new(),
            recent_limit: recent_limit.max(1),
        }
    }

    fn row_count(&self) -> usize {
        self.searches.len() + self.clicks.len() + self.observations.len()
    }
}

impl Default for InMemoryHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    async fn append_search(&self, record: SearchRecord) -> SearchResult<()> {
        if let Some(user_id) = record.user_id {
            let mut recent = self.recents.entry(user_id).or_default();
            recent.push_front(record.clone());
            while recent.len() > self.recent_limit {
                recent.pop_back();
            }
        }
        self.searches.insert(record.id, record);
        Ok(())
    }

    async fn append_click(&self, event: ClickEvent) -> SearchResult<()> {
        if !self.searches.contains_key(&event.search_id) {
            return Err(SearchError::NotFound(format!(
                "search {} was never recorded",
                event.search_id
            )));
        }
        self.clicks.insert(event.id, event);
        Ok(())
    }

    async fn append_observation(&self, observation: AbObservation) -> SearchResult<()> {
        self.observations.insert(observation.id, observation);
        Ok(())
    }

    async fn searches_in(&self, window: TimeWindow) -> SearchResult<Vec<SearchRecord>> {
        let mut rows: Vec<SearchRecord> = self
            .searches
            .iter()
            .filter(|entry| window.contains(entry.created_at))
            .map(|entry| entry.value().clone())
            .collect();
        rows.sort_by_key(|r| (r.created_at, r.id));
        Ok(rows)
    }

    async fn clicks_in(&self, window: TimeWindow) -> SearchResult<Vec<ClickEvent>> {
        let mut rows: Vec<ClickEvent> = self
            .clicks
            .iter()
            .filter(|entry| window.contains(entry.created_at))
            .map(|entry| entry.value().clone())
            .collect();
        rows.sort_by_key(|c| (c.created_at, c.id));
        Ok(rows)
    }

    async fn observations_for(&self, test_name: &str) -> SearchResult<Vec<AbObservation>> {
        let mut rows: Vec<AbObservation> = self
            .observations
            .iter()
            .filter(|entry| entry.test_name == test_name)
            .map(|entry| entry.value().clone())
            .collect();
        rows.sort_by_key(|o| (o.created_at, o.id));
        Ok(rows)
    }

    async fn recent_for_user(&self, user_id: Uuid) -> SearchResult<Vec<SearchRecord>> {
        Ok(self
            .recents
            .get(&user_id)
            .map(|recent| recent.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn prune_before(&self, cutoff: DateTime<Utc>) -> SearchResult<usize> {
        let before = self.row_count();
        self.searches.retain(|_, r| r.created_at >= cutoff);
        self.clicks.retain(|_, c| c.created_at >= cutoff);
        self.observations.retain(|_, o| o.created_at >= cutoff);
        for mut entry in self.recents.iter_mut() {
            entry.value_mut().retain(|r| r.created_at >= cutoff);
        }
        Ok(before.saturating_sub(self.row_count()))
    }
}
