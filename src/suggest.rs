//! Multi-source autocomplete.
//!
//! A prefix fans out to several independently fallible sources (torrent
//! names, tag/category/uploader facets, per-user recents, global
//! popular/trending queries). A failed source is logged and skipped
//! rather than failing the request. Candidates are merged with a
//! case-insensitive dedup that keeps the highest-scoring entry, then
//! ordered by score with an alphabetical tiebreak.
//!
//! Popular and trending read models scan a week of search history, so
//! they are cached with a TTL and rewarmed by the maintenance scheduler.

use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SuggestConfig;
use crate::engine::SearchEngine;
use crate::error::SearchResult;
use crate::history::HistoryStore;
use crate::models::TimeWindow;
use crate::query::{FilterCondition, FilterNode, QueryLimits, SearchRequest};

/// Prefixes at or below this length also surface global popular and
/// trending queries; past it the prefix is specific enough that only
/// prefix-matched sources are worth showing
const SHORT_PREFIX_MAX: usize = 2;

const POPULAR_WINDOW_DAYS: i64 = 7;
const TRENDING_RECENT_HOURS: i64 = 24;

/// A query must appear strictly more often than this in the recent
/// window to rank as trending
const TRENDING_MIN_RECENT: u64 = 5;

const POPULAR_CACHE_KEY: &str = "popular";
const TRENDING_CACHE_KEY: &str = "trending";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    TorrentName,
    Tag,
    Category,
    RecentSearch,
    PopularSearch,
    Uploader,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub text: String,
    pub kind: SuggestionKind,
    pub score: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
}

impl Suggestion {
    pub fn new(text: impl Into<String>, kind: SuggestionKind) -> Self {
        Self {
            text: text.into(),
            kind,
            score: 0.0,
            metadata: None,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Caller context for a suggestion request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuggestContext {
    /// Include this user's recent searches as a source
    pub user_id: Option<Uuid>,

    /// Restrict name/tag/uploader sources to one category
    pub category: Option<String>,
}

pub struct SuggestionService {
    engine: Arc<dyn SearchEngine>,
    history: Arc<dyn HistoryStore>,
    config: SuggestConfig,
    cache: Cache<String, Vec<Suggestion>>,
}

impl SuggestionService {
    pub fn new(
        engine: Arc<dyn SearchEngine>,
        history: Arc<dyn HistoryStore>,
        config: SuggestConfig,
    ) -> Self {
        let cache = Cache::builder()
            .max_capacity(8)
            .time_to_live(Duration::from_secs(config.cache_ttl_secs))
            .build();

        Self {
            engine,
            history,
            config,
            cache,
        }
    }

    /// Suggest completions for a partial query.
    ///
    /// Prefixes shorter than the configured minimum return nothing.
    /// Source failures degrade the result set instead of erroring.
    pub async fn suggest(
        &self,
        prefix: &str,
        context: &SuggestContext,
    ) -> SearchResult<Vec<Suggestion>> {
        let needle = normalize(prefix);
        if needle.len() < self.config.min_prefix_length {
            return Ok(Vec::new());
        }
        let limit = self.config.max_suggestions;

        let mut sources: Vec<(&'static str, BoxFuture<'_, SearchResult<Vec<Suggestion>>>)> = vec![
            (
                "names",
                self.name_suggestions(&needle, context, limit).boxed(),
            ),
            (
                "tags",
                self.facet_suggestions(&needle, "tags", SuggestionKind::Tag, context, limit)
                    .boxed(),
            ),
            (
                "uploaders",
                self.facet_suggestions(
                    &needle,
                    "uploader",
                    SuggestionKind::Uploader,
                    context,
                    limit,
                )
                .boxed(),
            ),
        ];
        if context.category.is_none() {
            sources.push((
                "categories",
                self.facet_suggestions(
                    &needle,
                    "category",
                    SuggestionKind::Category,
                    context,
                    limit,
                )
                .boxed(),
            ));
        }
        if let Some(user_id) = context.user_id {
            sources.push(("recent", self.recent_suggestions(user_id, &needle).boxed()));
        }
        if needle.len() <= SHORT_PREFIX_MAX {
            sources.push(("popular", self.popular().boxed()));
            sources.push(("trending", self.trending().boxed()));
        }

        let (labels, futures): (Vec<_>, Vec<_>) = sources.into_iter().unzip();
        let outcomes = futures::future::join_all(futures).await;

        let mut candidates = Vec::new();
        for (label, outcome) in labels.into_iter().zip(outcomes) {
            match outcome {
                Ok(mut suggestions) => candidates.append(&mut suggestions),
                Err(e) => {
                    tracing::warn!(source = label, error = %e, "Suggestion source failed")
                }
            }
        }

        Ok(merge(candidates, limit))
    }

    /// Category-scoped variant; names, tags and uploaders are restricted
    /// to the category
    pub async fn suggest_in_category(
        &self,
        prefix: &str,
        category: &str,
    ) -> SearchResult<Vec<Suggestion>> {
        let context = SuggestContext {
            category: Some(category.to_string()),
            ..Default::default()
        };
        self.suggest(prefix, &context).await
    }

    /// Most-searched queries over the trailing week, cached
    pub async fn popular(&self) -> SearchResult<Vec<Suggestion>> {
        if let Some(cached) = self.cache.get(POPULAR_CACHE_KEY).await {
            return Ok(cached);
        }
        let fresh = self.compute_popular().await?;
        self.cache
            .insert(POPULAR_CACHE_KEY.to_string(), fresh.clone())
            .await;
        Ok(fresh)
    }

    /// Queries whose recent volume is a large share of their weekly
    /// volume, cached
    pub async fn trending(&self) -> SearchResult<Vec<Suggestion>> {
        if let Some(cached) = self.cache.get(TRENDING_CACHE_KEY).await {
            return Ok(cached);
        }
        let fresh = self.compute_trending().await?;
        self.cache
            .insert(TRENDING_CACHE_KEY.to_string(), fresh.clone())
            .await;
        Ok(fresh)
    }

    /// Recompute the cached popular/trending read models. Called by the
    /// maintenance scheduler so interactive requests rarely pay the
    /// history scan.
    pub async fn rewarm(&self) -> SearchResult<()> {
        let popular = self.compute_popular().await?;
        self.cache
            .insert(POPULAR_CACHE_KEY.to_string(), popular)
            .await;

        let trending = self.compute_trending().await?;
        self.cache
            .insert(TRENDING_CACHE_KEY.to_string(), trending)
            .await;

        tracing::debug!("Rewarmed popular/trending suggestion caches");
        Ok(())
    }

    async fn name_suggestions(
        &self,
        needle: &str,
        context: &SuggestContext,
        limit: usize,
    ) -> SearchResult<Vec<Suggestion>> {
        let mut request = SearchRequest::new(needle).with_page(0, limit);
        if let Some(category) = &context.category {
            request = request.with_filter(FilterNode::condition(FilterCondition::Category(
                category.clone(),
            )));
        }
        let composed = request.compose(&QueryLimits::default())?;
        let results = self.engine.query(&composed).await?;

        Ok(results
            .hits
            .into_iter()
            .map(|hit| {
                let score = f64::from(hit.document.seeders) / 100.0;
                let suggestion =
                    Suggestion::new(hit.document.name, SuggestionKind::TorrentName)
                        .with_score(score);
                match &context.category {
                    Some(category) => suggestion.with_metadata(HashMap::from([(
                        "category".to_string(),
                        category.clone(),
                    )])),
                    None => suggestion,
                }
            })
            .collect())
    }

    /// Prefix-matched values of one facetable attribute, scored by how
    /// many torrents carry the value
    async fn facet_suggestions(
        &self,
        needle: &str,
        attribute: &str,
        kind: SuggestionKind,
        context: &SuggestContext,
        limit: usize,
    ) -> SearchResult<Vec<Suggestion>> {
        let mut request = SearchRequest::new("")
            .with_page(0, 1)
            .with_facets([attribute]);
        if let Some(category) = &context.category {
            request = request.with_filter(FilterNode::condition(FilterCondition::Category(
                category.clone(),
            )));
        }
        let composed = request.compose(&QueryLimits::default())?;
        let results = self.engine.query(&composed).await?;

        let mut suggestions: Vec<Suggestion> = results
            .facet_distribution
            .get(attribute)
            .map(|counts| {
                counts
                    .iter()
                    .filter(|(value, _)| value.to_lowercase().starts_with(needle))
                    .map(|(value, count)| {
                        Suggestion::new(value.clone(), kind).with_score(*count as f64)
                    })
                    .collect()
            })
            .unwrap_or_default();

        suggestions.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        suggestions.truncate(limit);
        Ok(suggestions)
    }

    async fn recent_suggestions(
        &self,
        user_id: Uuid,
        needle: &str,
    ) -> SearchResult<Vec<Suggestion>> {
        let recents = self.history.recent_for_user(user_id).await?;
        Ok(recents
            .into_iter()
            .filter(|record| normalize(&record.query_text).starts_with(needle))
            .map(|record| Suggestion::new(record.query_text, SuggestionKind::RecentSearch))
            .collect())
    }

    async fn compute_popular(&self) -> SearchResult<Vec<Suggestion>> {
        let window = TimeWindow::last_days(POPULAR_WINDOW_DAYS);
        let searches = self.history.searches_in(window).await?;

        // normalized query -> (display text, count)
        let mut counts: HashMap<String, (String, u64)> = HashMap::new();
        for record in searches {
            let key = normalize(&record.query_text);
            if key.is_empty() {
                continue;
            }
            let slot = counts
                .entry(key)
                .or_insert_with(|| (record.query_text.clone(), 0));
            slot.1 += 1;
        }

        let mut suggestions: Vec<Suggestion> = counts
            .into_values()
            .map(|(text, count)| {
                Suggestion::new(text, SuggestionKind::PopularSearch).with_score(count as f64)
            })
            .collect();
        suggestions.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        suggestions.truncate(self.config.max_suggestions);
        Ok(suggestions)
    }

    async fn compute_trending(&self) -> SearchResult<Vec<Suggestion>> {
        let week = TimeWindow::last_days(POPULAR_WINDOW_DAYS);
        let recent = TimeWindow::last_hours(TRENDING_RECENT_HOURS);
        let searches = self.history.searches_in(week).await?;

        // normalized query -> (display text, week count, recent count)
        let mut counts: HashMap<String, (String, u64, u64)> = HashMap::new();
        for record in searches {
            let key = normalize(&record.query_text);
            if key.is_empty() {
                continue;
            }
            let slot = counts
                .entry(key)
                .or_insert_with(|| (record.query_text.clone(), 0, 0));
            slot.1 += 1;
            if recent.contains(record.created_at) {
                slot.2 += 1;
            }
        }

        let mut suggestions: Vec<Suggestion> = counts
            .into_values()
            .filter(|(_, _, recent_count)| *recent_count > TRENDING_MIN_RECENT)
            .map(|(text, week_count, recent_count)| {
                let velocity = recent_count as f64 / week_count as f64;
                Suggestion::new(text, SuggestionKind::PopularSearch).with_score(velocity)
            })
            .collect();
        suggestions.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        suggestions.truncate(self.config.max_suggestions);
        Ok(suggestions)
    }
}

/// Merge candidates from every source. Entries whose normalized text
/// collides keep the highest-scoring candidate; order is score
/// descending with an alphabetical tiebreak.
fn merge(candidates: Vec<Suggestion>, limit: usize) -> Vec<Suggestion> {
    let mut merged: HashMap<String, Suggestion> = HashMap::new();
    for candidate in candidates {
        let key = normalize(&candidate.text);
        if key.is_empty() {
            continue;
        }
        match merged.entry(key) {
            Entry::Occupied(mut slot) => {
                if candidate.score > slot.get().score {
                    *slot.get_mut() = candidate;
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(candidate);
            }
        }
    }

    let mut out: Vec<Suggestion> = merged.into_values().collect();
    out.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.text.to_lowercase().cmp(&b.text.to_lowercase()))
    });
    out.truncate(limit);
    out
}

/// Lowercase, trim, and collapse runs of whitespace
fn normalize(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
