//! Facade wiring the search stack behind the operations the API layer
//! calls.
//!
//! Degradation rules live here: an unreachable or slow engine turns a
//! search into an empty, `degraded` result page instead of an error, and
//! a failed history write never fails the search it was attached to.
//! Composer validation errors still return synchronously to the caller.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use uuid::Uuid;

use crate::analytics::SearchAnalytics;
use crate::catalog::{CatalogStore, CatalogWriter, InMemoryCatalog};
use crate::config::Config;
use crate::engine::{create_engine, IndexSettings, SearchEngine};
use crate::error::{SearchError, SearchResult};
use crate::facets::normalize_distribution;
use crate::history::{HistoryStore, InMemoryHistory};
use crate::indexer::BatchIndexer;
use crate::query::{QueryLimits, SearchRequest, SearchResults};
use crate::queue::{create_queue, IndexQueue};
use crate::suggest::{SuggestContext, Suggestion, SuggestionService};

/// What a search call hands back to the API layer.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub results: SearchResults,
    /// Id for click attribution; absent when the history write failed.
    pub search_id: Option<Uuid>,
    /// Set when the engine was unreachable or timed out and the results
    /// were replaced with an empty page.
    pub degraded: bool,
}

/// Operational snapshot for the admin health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub engine_healthy: bool,
    pub queue_depth: usize,
    pub documents: u64,
}

/// The assembled search platform.
pub struct SearchService {
    engine: Arc<dyn SearchEngine>,
    queue: Arc<dyn IndexQueue>,
    catalog: Arc<dyn CatalogStore>,
    history: Arc<dyn HistoryStore>,
    indexer: Arc<BatchIndexer>,
    suggestions: Arc<SuggestionService>,
    analytics: SearchAnalytics,
    limits: QueryLimits,
    query_timeout: Duration,
}

impl SearchService {
    /// Wire the stack over the given backends and configure the engine's
    /// index settings.
    ///
    /// A rejected configuration is fatal here; the service never starts
    /// serving against an unconfigured index.
    pub async fn start(
        config: &Config,
        engine: Arc<dyn SearchEngine>,
        queue: Arc<dyn IndexQueue>,
        catalog: Arc<dyn CatalogStore>,
        history: Arc<dyn HistoryStore>,
    ) -> SearchResult<Self> {
        engine
            .configure(&IndexSettings::default())
            .await
            .map_err(|e| SearchError::Configuration(format!("Index settings rejected: {e}")))?;

        let indexer = Arc::new(BatchIndexer::new(
            queue.clone(),
            catalog.clone(),
            engine.clone(),
            config.indexer.clone(),
        ));
        let suggestions = Arc::new(SuggestionService::new(
            engine.clone(),
            history.clone(),
            config.suggest.clone(),
        ));
        let analytics = SearchAnalytics::new(history.clone(), engine.clone());

        tracing::info!("Search service started");
        Ok(Self {
            engine,
            queue,
            catalog,
            history,
            indexer,
            suggestions,
            analytics,
            limits: QueryLimits::from(&config.query),
            query_timeout: Duration::from_millis(config.query.timeout_ms),
        })
    }

    /// Build the service from configuration alone, creating the engine and
    /// queue backends it names and in-memory catalog and history stores.
    pub async fn from_config(config: &Config) -> SearchResult<Self> {
        let engine = create_engine(&config.engine)?;
        let queue = create_queue(&config.queue)?;
        let catalog: Arc<dyn CatalogStore> = Arc::new(InMemoryCatalog::new());
        let history: Arc<dyn HistoryStore> = Arc::new(InMemoryHistory::new());
        Self::start(config, engine, queue, catalog, history).await
    }

    /// Writer through which catalog mutations enqueue their index updates.
    pub fn writer(&self) -> CatalogWriter {
        CatalogWriter::new(self.catalog.clone(), self.queue.clone())
    }

    /// Execute a search and record it in the history store.
    ///
    /// Validation errors from composition are returned as-is. Engine
    /// failures and timeouts degrade to an empty page with the `degraded`
    /// flag set.
    pub async fn search(&self, request: &SearchRequest) -> SearchResult<SearchOutcome> {
        let composed = request.compose(&self.limits)?;
        let started = Instant::now();

        let (results, degraded) =
            match tokio::time::timeout(self.query_timeout, self.engine.query(&composed)).await {
                Ok(Ok(engine_results)) => {
                    let results = SearchResults {
                        hits: engine_results.hits,
                        total: engine_results.total,
                        offset: composed.offset,
                        limit: composed.limit,
                        processing_time_ms: engine_results.processing_time_ms,
                        facets: normalize_distribution(engine_results.facet_distribution),
                    };
                    (results, false)
                }
                Ok(Err(error)) => {
                    tracing::error!(error = %error, "Engine query failed; serving empty results");
                    (SearchResults::empty(composed.offset, composed.limit), true)
                }
                Err(_) => {
                    let error = SearchError::Timeout(self.query_timeout);
                    tracing::error!(error = %error, "Engine query timed out; serving empty results");
                    (SearchResults::empty(composed.offset, composed.limit), true)
                }
            };

        let filters = match &request.filter {
            Some(filter) => serde_json::to_value(filter).ok(),
            None => None,
        };
        let latency_ms = started.elapsed().as_millis() as u64;
        let search_id = match self
            .analytics
            .record_search(
                request.user_id,
                &composed.text,
                filters,
                results.total as usize,
                latency_ms,
            )
            .await
        {
            Ok(id) => Some(id),
            Err(error) => {
                tracing::warn!(error = %error, "Failed to record search history");
                None
            }
        };

        Ok(SearchOutcome {
            results,
            search_id,
            degraded,
        })
    }

    /// Suggest completions for a partial query.
    pub async fn suggest(
        &self,
        prefix: &str,
        context: &SuggestContext,
    ) -> SearchResult<Vec<Suggestion>> {
        self.suggestions.suggest(prefix, context).await
    }

    /// Attribute a result click to an earlier search.
    pub async fn track_click(
        &self,
        search_id: Uuid,
        user_id: Option<Uuid>,
        subject_id: Uuid,
        position: u32,
    ) -> SearchResult<()> {
        self.analytics
            .record_click(search_id, user_id, subject_id, position)
            .await
    }

    /// Record which experiment arm served a search.
    pub async fn record_observation(
        &self,
        user_id: Option<Uuid>,
        test_name: &str,
        variant: &str,
        query_text: &str,
        result_count: usize,
    ) -> SearchResult<()> {
        self.analytics
            .record_variant_observation(user_id, test_name, variant, query_text, result_count)
            .await
    }

    /// Rebuild the whole index from the catalog. Returns the number of
    /// documents indexed.
    pub async fn trigger_reindex(&self) -> SearchResult<u64> {
        self.indexer.full_reindex().await
    }

    /// Remove every document from the index.
    pub async fn clear_index(&self) -> SearchResult<()> {
        self.indexer.clear_index().await
    }

    /// Entries waiting in the outbox queue.
    pub async fn queue_depth(&self) -> SearchResult<usize> {
        self.queue.depth().await
    }

    /// Operational snapshot of the engine and queue.
    pub async fn health(&self) -> SearchResult<HealthReport> {
        let engine_healthy = self.engine.health().await.unwrap_or(false);
        let documents = self
            .engine
            .stats()
            .await
            .map(|stats| stats.number_of_documents)
            .unwrap_or(0);
        let queue_depth = self.queue.depth().await?;
        Ok(HealthReport {
            engine_healthy,
            queue_depth,
            documents,
        })
    }

    /// Analytics reports over the recorded history.
    pub fn analytics(&self) -> &SearchAnalytics {
        &self.analytics
    }

    /// The suggestion engine, shared with the maintenance rewarm job.
    pub fn suggestions(&self) -> Arc<SuggestionService> {
        self.suggestions.clone()
    }

    /// The batch indexer, shared with its background run loop.
    pub fn indexer(&self) -> Arc<BatchIndexer> {
        self.indexer.clone()
    }

    /// The history store, shared with the retention job.
    pub fn history(&self) -> Arc<dyn HistoryStore> {
        self.history.clone()
    }
}
