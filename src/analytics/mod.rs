//! Search analytics and reporting.
//!
//! Write operations append to the history store; every report is a pure
//! read over persisted history and never touches the index. Reports
//! take an explicit half-open [`TimeWindow`] so callers control the
//! period, and trend buckets are aligned to the window start.

mod statistics;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::SearchEngine;
use crate::error::{SearchError, SearchResult};
use crate::history::HistoryStore;
use crate::models::{AbObservation, ClickEvent, SearchRecord, TimeWindow};
use self::statistics::{mean, percentile};

/// Which slice of search history a rate is computed over
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyticsScope {
    Global,
    User(Uuid),
    Query(String),
}

impl AnalyticsScope {
    fn matches(&self, record: &SearchRecord) -> bool {
        match self {
            AnalyticsScope::Global => true,
            AnalyticsScope::User(user_id) => record.user_id == Some(*user_id),
            AnalyticsScope::Query(query) => {
                record.query_text.trim().to_lowercase() == query.trim().to_lowercase()
            }
        }
    }
}

/// One query's aggregate standing over a window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopularQuery {
    pub query: String,
    pub search_count: u64,
    pub avg_results: f64,
    pub avg_latency_ms: f64,
    pub last_searched: DateTime<Utc>,
}

/// A query that keeps coming back empty
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoResultQuery {
    pub query: String,
    pub search_count: u64,
    pub last_searched: DateTime<Utc>,
}

/// Latency and volume statistics over a window
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub total_searches: u64,
    pub mean_latency_ms: f64,
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
    pub median_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub avg_results: f64,
}

/// Search volume inside one trend bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendBucket {
    pub bucket_start: DateTime<Utc>,
    pub search_count: u64,
    pub unique_users: u64,
    pub avg_results: f64,
}

/// Aggregate for one experiment arm
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantReport {
    pub variant: String,
    pub total_searches: u64,
    pub avg_results: f64,
    pub unique_users: u64,
}

/// A frequently clicked result and where it ranked when clicked
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopClicked {
    pub subject_id: Uuid,
    pub name: String,
    pub click_count: u64,
    pub avg_position: f64,
}

/// How often one filter combination is used
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterUsage {
    pub filters: serde_json::Value,
    pub usage_count: u64,
    pub avg_results: f64,
}

pub struct SearchAnalytics {
    history: Arc<dyn HistoryStore>,
    engine: Arc<dyn SearchEngine>,
}

impl SearchAnalytics {
    pub fn new(history: Arc<dyn HistoryStore>, engine: Arc<dyn SearchEngine>) -> Self {
        Self { history, engine }
    }

    /// Record an executed search and return its id for click attribution
    pub async fn record_search(
        &self,
        user_id: Option<Uuid>,
        query_text: &str,
        filters: Option<serde_json::Value>,
        result_count: usize,
        latency_ms: u64,
    ) -> SearchResult<Uuid> {
        let record = SearchRecord::new(user_id, query_text, filters, result_count, latency_ms);
        let search_id = record.id;
        self.history.append_search(record).await?;
        Ok(search_id)
    }

    /// Attribute a result click to a recorded search.
    ///
    /// Fails with `NotFound` when the search id was never recorded.
    pub async fn record_click(
        &self,
        search_id: Uuid,
        user_id: Option<Uuid>,
        subject_id: Uuid,
        position: u32,
    ) -> SearchResult<()> {
        self.history
            .append_click(ClickEvent::new(search_id, user_id, subject_id, position))
            .await
    }

    /// Record which experiment arm served a search
    pub async fn record_variant_observation(
        &self,
        user_id: Option<Uuid>,
        test_name: &str,
        variant: &str,
        query_text: &str,
        result_count: usize,
    ) -> SearchResult<()> {
        self.history
            .append_observation(AbObservation::new(
                user_id,
                test_name,
                variant,
                query_text,
                result_count,
            ))
            .await
    }

    /// Share of searches in scope that received at least one click.
    ///
    /// Repeat clicks on one search count once. Zero searches in scope
    /// gives a rate of zero rather than an error.
    pub async fn click_through_rate(
        &self,
        scope: &AnalyticsScope,
        window: TimeWindow,
    ) -> SearchResult<f64> {
        let searches = self.history.searches_in(window).await?;
        let scoped: HashSet<Uuid> = searches
            .iter()
            .filter(|record| scope.matches(record))
            .map(|record| record.id)
            .collect();
        if scoped.is_empty() {
            return Ok(0.0);
        }

        let clicks = self.history.clicks_in(window).await?;
        let clicked: HashSet<Uuid> = clicks
            .iter()
            .map(|click| click.search_id)
            .filter(|search_id| scoped.contains(search_id))
            .collect();

        Ok(clicked.len() as f64 / scoped.len() as f64)
    }

    /// Most-run queries in the window, ranked by volume with a recency
    /// tiebreak. Queries below `min_count` are dropped.
    pub async fn popular_queries(
        &self,
        window: TimeWindow,
        min_count: u64,
        limit: usize,
    ) -> SearchResult<Vec<PopularQuery>> {
        let searches = self.history.searches_in(window).await?;

        struct Accum {
            count: u64,
            results_sum: u64,
            latency_sum: u64,
            last_searched: DateTime<Utc>,
        }

        let mut groups: HashMap<String, Accum> = HashMap::new();
        for record in searches {
            let slot = groups.entry(record.query_text).or_insert(Accum {
                count: 0,
                results_sum: 0,
                latency_sum: 0,
                last_searched: record.created_at,
            });
            slot.count += 1;
            slot.results_sum += record.result_count as u64;
            slot.latency_sum += record.latency_ms;
            if record.created_at > slot.last_searched {
                slot.last_searched = record.created_at;
            }
        }

        let mut rows: Vec<PopularQuery> = groups
            .into_iter()
            .filter(|(_, accum)| accum.count >= min_count)
            .map(|(query, accum)| PopularQuery {
                query,
                search_count: accum.count,
                avg_results: accum.results_sum as f64 / accum.count as f64,
                avg_latency_ms: accum.latency_sum as f64 / accum.count as f64,
                last_searched: accum.last_searched,
            })
            .collect();

        rows.sort_by(|a, b| {
            b.search_count
                .cmp(&a.search_count)
                .then_with(|| b.last_searched.cmp(&a.last_searched))
                .then_with(|| a.query.cmp(&b.query))
        });
        rows.truncate(limit);
        Ok(rows)
    }

    /// Queries that returned nothing, for catalog-gap detection
    pub async fn no_result_queries(
        &self,
        window: TimeWindow,
        limit: usize,
    ) -> SearchResult<Vec<NoResultQuery>> {
        let searches = self.history.searches_in(window).await?;

        let mut groups: HashMap<String, (u64, DateTime<Utc>)> = HashMap::new();
        for record in searches {
            if record.result_count != 0 {
                continue;
            }
            let slot = groups
                .entry(record.query_text)
                .or_insert((0, record.created_at));
            slot.0 += 1;
            if record.created_at > slot.1 {
                slot.1 = record.created_at;
            }
        }

        let mut rows: Vec<NoResultQuery> = groups
            .into_iter()
            .map(|(query, (count, last_searched))| NoResultQuery {
                query,
                search_count: count,
                last_searched,
            })
            .collect();

        rows.sort_by(|a, b| {
            b.search_count
                .cmp(&a.search_count)
                .then_with(|| b.last_searched.cmp(&a.last_searched))
                .then_with(|| a.query.cmp(&b.query))
        });
        rows.truncate(limit);
        Ok(rows)
    }

    /// Latency statistics over the window; an empty window reports zeros
    pub async fn performance_stats(&self, window: TimeWindow) -> SearchResult<PerformanceStats> {
        let searches = self.history.searches_in(window).await?;
        if searches.is_empty() {
            return Ok(PerformanceStats::default());
        }

        let mut latencies: Vec<f64> = searches
            .iter()
            .map(|record| record.latency_ms as f64)
            .collect();
        latencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let results: Vec<f64> = searches
            .iter()
            .map(|record| record.result_count as f64)
            .collect();

        Ok(PerformanceStats {
            total_searches: searches.len() as u64,
            mean_latency_ms: mean(&latencies),
            min_latency_ms: searches.iter().map(|r| r.latency_ms).min().unwrap_or(0),
            max_latency_ms: searches.iter().map(|r| r.latency_ms).max().unwrap_or(0),
            median_latency_ms: percentile(&latencies, 50.0),
            p95_latency_ms: percentile(&latencies, 95.0),
            avg_results: mean(&results),
        })
    }

    /// Search volume bucketed over the window. Buckets start at the
    /// window start; empty buckets are omitted.
    pub async fn trend(
        &self,
        window: TimeWindow,
        bucket: Duration,
    ) -> SearchResult<Vec<TrendBucket>> {
        let bucket_secs = bucket.num_seconds();
        if bucket_secs <= 0 {
            return Err(SearchError::Validation(
                "Trend bucket size must be positive".to_string(),
            ));
        }

        let searches = self.history.searches_in(window).await?;

        struct Accum {
            count: u64,
            results_sum: u64,
            users: HashSet<Uuid>,
        }

        let mut buckets: BTreeMap<i64, Accum> = BTreeMap::new();
        for record in searches {
            let offset = (record.created_at - window.start).num_seconds();
            let index = offset / bucket_secs;
            let slot = buckets.entry(index).or_insert(Accum {
                count: 0,
                results_sum: 0,
                users: HashSet::new(),
            });
            slot.count += 1;
            slot.results_sum += record.result_count as u64;
            if let Some(user_id) = record.user_id {
                slot.users.insert(user_id);
            }
        }

        Ok(buckets
            .into_iter()
            .map(|(index, accum)| TrendBucket {
                bucket_start: window.start + Duration::seconds(index * bucket_secs),
                search_count: accum.count,
                unique_users: accum.users.len() as u64,
                avg_results: accum.results_sum as f64 / accum.count as f64,
            })
            .collect())
    }

    /// Per-arm aggregates for one experiment, ordered by variant name
    pub async fn variant_report(
        &self,
        test_name: &str,
        window: TimeWindow,
    ) -> SearchResult<Vec<VariantReport>> {
        let observations = self.history.observations_for(test_name).await?;

        let mut groups: BTreeMap<String, (u64, u64, HashSet<Uuid>)> = BTreeMap::new();
        for observation in observations {
            if !window.contains(observation.created_at) {
                continue;
            }
            let slot = groups
                .entry(observation.variant)
                .or_insert((0, 0, HashSet::new()));
            slot.0 += 1;
            slot.1 += observation.result_count as u64;
            if let Some(user_id) = observation.user_id {
                slot.2.insert(user_id);
            }
        }

        Ok(groups
            .into_iter()
            .map(|(variant, (total, results_sum, users))| VariantReport {
                variant,
                total_searches: total,
                avg_results: results_sum as f64 / total as f64,
                unique_users: users.len() as u64,
            })
            .collect())
    }

    /// Most-clicked results in the window with their average clicked
    /// position. Clicks on subjects no longer in the index are dropped.
    pub async fn top_clicked(
        &self,
        window: TimeWindow,
        limit: usize,
    ) -> SearchResult<Vec<TopClicked>> {
        let clicks = self.history.clicks_in(window).await?;

        let mut groups: HashMap<Uuid, (u64, u64)> = HashMap::new();
        for click in &clicks {
            let slot = groups.entry(click.subject_id).or_insert((0, 0));
            slot.0 += 1;
            slot.1 += u64::from(click.position);
        }

        let mut ranked: Vec<(Uuid, u64, f64)> = groups
            .into_iter()
            .map(|(subject_id, (count, position_sum))| {
                (subject_id, count, position_sum as f64 / count as f64)
            })
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let mut top = Vec::new();
        for (subject_id, click_count, avg_position) in ranked {
            if top.len() == limit {
                break;
            }
            if let Some(document) = self.engine.get_document(subject_id).await? {
                top.push(TopClicked {
                    subject_id,
                    name: document.name,
                    click_count,
                    avg_position,
                });
            }
        }
        Ok(top)
    }

    /// Usage counts per filter combination, grouped on the serialized
    /// filter snapshot
    pub async fn filter_usage(
        &self,
        window: TimeWindow,
        limit: usize,
    ) -> SearchResult<Vec<FilterUsage>> {
        let searches = self.history.searches_in(window).await?;

        struct Accum {
            filters: serde_json::Value,
            count: u64,
            results_sum: u64,
        }

        let mut groups: HashMap<String, Accum> = HashMap::new();
        for record in searches {
            if let Some(filters) = record.filters {
                let key = filters.to_string();
                let slot = groups.entry(key).or_insert(Accum {
                    filters,
                    count: 0,
                    results_sum: 0,
                });
                slot.count += 1;
                slot.results_sum += record.result_count as u64;
            }
        }

        let mut rows: Vec<(String, Accum)> = groups.into_iter().collect();
        rows.sort_by(|a, b| b.1.count.cmp(&a.1.count).then_with(|| a.0.cmp(&b.0)));
        rows.truncate(limit);

        Ok(rows
            .into_iter()
            .map(|(_, accum)| FilterUsage {
                filters: accum.filters,
                usage_count: accum.count,
                avg_results: accum.results_sum as f64 / accum.count as f64,
            })
            .collect())
    }

    /// A user's recent searches, newest first
    pub async fn user_history(&self, user_id: Uuid) -> SearchResult<Vec<SearchRecord>> {
        self.history.recent_for_user(user_id).await
    }
}
